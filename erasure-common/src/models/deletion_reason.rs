use std::fmt;
use std::str::FromStr;

/// The reasons a requester can pick from. Codes are what forms submit; display text is
/// what ends up in the support notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeletionReason {
    PrivacyConcerns,
    NoLongerUsing,
    TooManyEmails,
    FoundAlternative,
    AccountSecurity,
    Other,
}

impl DeletionReason {
    pub const ALL: [DeletionReason; 6] = [
        DeletionReason::PrivacyConcerns,
        DeletionReason::NoLongerUsing,
        DeletionReason::TooManyEmails,
        DeletionReason::FoundAlternative,
        DeletionReason::AccountSecurity,
        DeletionReason::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DeletionReason::PrivacyConcerns => "privacy-concerns",
            DeletionReason::NoLongerUsing => "no-longer-using",
            DeletionReason::TooManyEmails => "too-many-emails",
            DeletionReason::FoundAlternative => "found-alternative",
            DeletionReason::AccountSecurity => "account-security",
            DeletionReason::Other => "other",
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            DeletionReason::PrivacyConcerns => "Privacy concerns",
            DeletionReason::NoLongerUsing => "No longer using the service",
            DeletionReason::TooManyEmails => "Receiving too many emails",
            DeletionReason::FoundAlternative => "Found a better alternative",
            DeletionReason::AccountSecurity => "Account security concerns",
            DeletionReason::Other => "Other",
        }
    }

    /// Display text for `code`. Codes outside the catalogue are their own text.
    pub fn resolve_text(code: &str) -> String {
        match code.parse::<DeletionReason>() {
            Ok(reason) => String::from(reason.display_text()),
            Err(_) => String::from(code),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownReason;

impl FromStr for DeletionReason {
    type Err = UnknownReason;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        DeletionReason::ALL
            .into_iter()
            .find(|reason| reason.code() == code)
            .ok_or(UnknownReason)
    }
}

impl fmt::Display for DeletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}
