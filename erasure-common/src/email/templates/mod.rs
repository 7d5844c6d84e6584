use std::time::{Duration, SystemTime};

use crate::models::deletion_request::DeletionRequest;

pub struct DeletionConfirmationMessage {}
pub struct SupportNoticeMessage {}

impl DeletionConfirmationMessage {
    pub fn generate(url: &str, token: &str, token_lifetime: Duration) -> String {
        let link = format!("{}?token={}", url, token);

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>Confirm Your Account Deletion Request</h1>
               <p>We received a request to delete the account associated with this email \
               address. Clicking the link below will confirm the request and forward it to \
               our support team.</p>
               <p><a href=\"{}\" rel=\"nofollow\">Click here</a></p>
               <p><b>This link will expire in {} hours.</b></p>
               <br />
               <p><i>Didn't request this? Just ignore this email and don't click the \
               link.</i></p>
             </body>
             </html>",
            link,
            token_lifetime.as_secs() / 3600,
        )
    }
}

impl SupportNoticeMessage {
    pub fn generate(request: &DeletionRequest) -> String {
        let feedback = if request.feedback.trim().is_empty() {
            "(none provided)"
        } else {
            &request.feedback
        };

        let confirmed_at = match request.confirmed_at {
            Some(t) => unix_seconds(t).to_string(),
            None => String::from("(not confirmed)"),
        };

        format!(
            "A user has confirmed a request to delete their account.\n\
             \n\
             Email: {}\n\
             Reason: {} ({})\n\
             Feedback: {}\n\
             \n\
             Token: {}\n\
             Requested at (Unix seconds): {}\n\
             Confirmed at (Unix seconds): {}\n",
            request.email,
            request.reason_text,
            request.reason,
            feedback,
            request.token,
            unix_seconds(request.created_at),
            confirmed_at,
        )
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
