use crate::auth::CSRF_FIELD;
use crate::model::Post;
use crate::toggle::{BookmarkState, ICON_CLASS};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the detail page. Drafts get no bookmark button; `csrf_token` is
/// only present for logged-in readers.
pub fn render_post_detail(post: &Post, is_bookmarked: bool, csrf_token: Option<&str>) -> String {
    let csrf_input = csrf_token
        .map(|t| {
            format!(
                r#"<input type="hidden" name="{}" value="{}">"#,
                CSRF_FIELD,
                escape_html(t)
            )
        })
        .unwrap_or_default();

    let bookmark_button = if post.is_published() {
        let state = if is_bookmarked {
            BookmarkState::Bookmarked
        } else {
            BookmarkState::Removed
        };
        format!(
            r#"<a href="" class="btn-bookmark" data-url="/posts/bookmark/" data-pk="{}"><i class="{} {}"></i></a>"#,
            post.id,
            ICON_CLASS,
            state.icon_class()
        )
    } else {
        String::new()
    };

    format!(
        r#"<!doctype html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{title}</title>
    </head>
    <body>
        {csrf_input}
        <article>
            <h1>{title}</h1>
            {bookmark_button}
            <p class="views">{views} views</p>
            <div class="content">{content}</div>
        </article>
    </body>
</html>
"#,
        title = escape_html(&post.title),
        views = post.views,
        content = escape_html(&post.content),
    )
}
