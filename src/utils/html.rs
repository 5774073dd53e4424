/// Clean user-supplied HTML from the rich text editor.
///
/// Whitelist-based: safe formatting tags (`<b>`, `<p>`, lists, links) survive,
/// while `<script>`, `<iframe>`, event-handler attributes and `javascript:` URLs
/// are stripped. Runs on every post and comment body before it is stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
