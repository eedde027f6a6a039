// File: src/error_page.rs
// Purpose: Minimal HTML error page for typed and unhandled errors

use axum::http::StatusCode;
use maud::{html, Markup, PreEscaped, DOCTYPE};

const CLIENT_ERROR_COLOR: &str = "#006ce9";
const SERVER_ERROR_COLOR: &str = "#713fc2";

/// Renders the error page for a status and message. The message is escaped.
pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let color = if status.is_server_error() {
        SERVER_ERROR_COLOR
    } else {
        CLIENT_ERROR_COLOR
    };
    let style = format!(
        "body{{color:{color};background-color:#fafafa;padding:30px;font-family:Helvetica,Arial,sans-serif}}\
         p{{max-width:600px;margin:60px auto 30px auto;background:white;border-radius:4px;\
         box-shadow:0px 0px 50px -20px {color};overflow:hidden}}\
         strong{{display:inline-block;padding:15px;background:{color};color:white}}\
         span{{display:inline-block;padding:15px}}"
    );

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta http-equiv="Status" content=(status.as_u16());
                title { (status.as_u16()) " " (message) }
                meta name="viewport" content="width=device-width,initial-scale=1";
                style { (PreEscaped(style)) }
            }
            body {
                p {
                    strong { (status.as_u16()) }
                    " "
                    span { (message) }
                }
            }
        }
    }
}
