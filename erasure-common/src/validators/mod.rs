#[derive(Debug, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }
}

/// Deliberately loose. The confirmation email is the real proof that the address works.
pub fn validate_email_address(email: &str) -> Validity {
    if !email.contains('@') {
        return Validity::Invalid(String::from(
            "Email address must contain an at symbol (@).",
        ));
    }

    Validity::Valid
}

pub fn validate_reason(reason: &str) -> Validity {
    if reason.trim().is_empty() {
        return Validity::Invalid(String::from("A reason for deletion must be provided."));
    }

    Validity::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_address() {
        assert!(validate_email_address("test@example.com").is_valid());
        assert!(validate_email_address("a@b").is_valid());
        assert!(validate_email_address("@").is_valid());
        assert!(validate_email_address("firstname+lastname@example.com").is_valid());

        assert!(!validate_email_address("").is_valid());
        assert!(!validate_email_address("testexample.com").is_valid());
        assert!(!validate_email_address("   ").is_valid());
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("privacy-concerns").is_valid());
        assert!(validate_reason("something we have never heard of").is_valid());

        assert_eq!(
            validate_reason(""),
            Validity::Invalid(String::from("A reason for deletion must be provided."))
        );
        assert!(!validate_reason(" \t\n").is_valid());
    }
}
