use crate::html::escape_html;

pub struct ConfirmDeletionLinkMissingTokenPage {}
pub struct ConfirmDeletionInvalidLinkPage {}
pub struct ConfirmDeletionExpiredLinkPage {}
pub struct ConfirmDeletionAlreadyConfirmedPage {}
pub struct ConfirmDeletionInternalErrorPage {}
pub struct ConfirmDeletionSuccessPage {}

impl ConfirmDeletionLinkMissingTokenPage {
    pub fn generate() -> &'static str {
        "<!DOCTYPE html>
         <html>
           <head>
             <title>Account Deletion Request</title>
             <style>
               body {
                 font-family: Arial, sans-serif;
               }
             </style>
           </head>
           <body>
             <h1>This link is invalid because it is missing a token.</h1>
             <h2>Please use the full link from the email we sent you.</h2>
           </body>
         </html>"
    }
}

impl ConfirmDeletionInvalidLinkPage {
    pub fn generate() -> &'static str {
        "<!DOCTYPE html>
         <html>
           <head>
             <title>Account Deletion Request</title>
             <style>
               body {
                 font-family: Arial, sans-serif;
               }
             </style>
           </head>
           <body>
             <h1>This link is invalid.</h1>
             <h2>The request may have been withdrawn or never existed. You can submit a new \
             deletion request at any time.</h2>
           </body>
         </html>"
    }
}

impl ConfirmDeletionExpiredLinkPage {
    pub fn generate() -> &'static str {
        "<!DOCTYPE html>
         <html>
           <head>
             <title>Account Deletion Request</title>
             <style>
               body {
                 font-family: Arial, sans-serif;
               }
             </style>
           </head>
           <body>
             <h1>This link has expired.</h1>
             <h2>Please submit a new deletion request to get a fresh link.</h2>
           </body>
         </html>"
    }
}

impl ConfirmDeletionAlreadyConfirmedPage {
    pub fn generate() -> &'static str {
        "<!DOCTYPE html>
         <html>
           <head>
             <title>Account Deletion Request</title>
             <style>
               body {
                 font-family: Arial, sans-serif;
               }
             </style>
           </head>
           <body>
             <h1>This deletion request has already been confirmed.</h1>
             <h2>Our support team has your request. There is nothing more you need to do.</h2>
           </body>
         </html>"
    }
}

impl ConfirmDeletionInternalErrorPage {
    pub fn generate() -> &'static str {
        "<!DOCTYPE html>
         <html>
           <head>
             <title>Account Deletion Request</title>
             <style>
               body {
                 font-family: Arial, sans-serif;
               }
             </style>
           </head>
           <body>
             <h1>Could not confirm your deletion request due to an error.</h1>
             <h2>We're sorry. We'll try to fix this. Please try again in a few hours.</h2>
           </body>
         </html>"
    }
}

impl ConfirmDeletionSuccessPage {
    pub fn generate(user_email: &str) -> String {
        format!(
            "<!DOCTYPE html>
             <html>
               <head>
                 <title>Account Deletion Request</title>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                   }}
                 </style>
               </head>
               <body>
                 <h1>Your deletion request has been confirmed.</h1>
                 <h2>Email address: {}</h2>
                 <h2>Our support team will process the deletion of your account and contact \
                 you if anything else is needed.</h2>
               </body>
             </html>",
            escape_html(user_email),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_page_escapes_email() {
        let page = ConfirmDeletionSuccessPage::generate("<b>x</b>@example.com");

        assert!(page.contains("Email address: &lt;b&gt;x&lt;/b&gt;@example.com"));
        assert!(!page.contains("<b>x</b>"));
    }
}
