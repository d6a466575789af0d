//! Access decisions for the edge session guard.
//!
//! The decision is a pure function of three inputs: whether a credential
//! cookie is present, what the remote identity check said, and which route
//! group the request targets. Any doubt resolves to the login page.

use super::pages::PageUrl;

/// Route groups the guard distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCategory {
    /// Login and sign-up pages.
    PublicOnboarding,
    /// Pages that require a session.
    ProtectedDashboard,
    /// Everything else.
    Other,
}

impl RouteCategory {
    /// Classify a request path.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::guard::RouteCategory;
    ///
    /// assert_eq!(RouteCategory::classify("/dashboard/home"), RouteCategory::ProtectedDashboard);
    /// assert_eq!(RouteCategory::classify("/onboarding/login"), RouteCategory::PublicOnboarding);
    /// assert_eq!(RouteCategory::classify("/"), RouteCategory::Other);
    /// ```
    #[must_use]
    pub fn classify(path: &str) -> Self {
        if path.starts_with("/onboarding") {
            Self::PublicOnboarding
        } else if path.starts_with("/dashboard") {
            Self::ProtectedDashboard
        } else {
            Self::Other
        }
    }

    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PublicOnboarding => "public_onboarding",
            Self::ProtectedDashboard => "protected_dashboard",
            Self::Other => "other",
        }
    }
}

const UNGUARDED_PREFIXES: [&str; 6] = [
    "/api",
    "/_next/static",
    "/_next/image",
    "/assets",
    "/favicon.ico",
    "/sw.js",
];

/// Whether the guard runs for `path`.
///
/// Static assets and the API passthrough are never gated. Matching is by
/// prefix, so `/apiary` is skipped too.
#[must_use]
pub fn is_guarded_path(path: &str) -> bool {
    !UNGUARDED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Result of the remote identity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// No credential, so no check was made.
    NotChecked,
    /// The identity endpoint accepted the credential.
    Valid,
    /// Rejected, unreachable or otherwise inconclusive.
    Invalid,
}

/// What the guard does with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Continue to the page.
    Allow,
    /// Send the browser elsewhere.
    Redirect(PageUrl),
}

impl GuardDecision {
    /// Decide the outcome for one navigation.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::guard::{GuardDecision, RouteCategory, Verification};
    /// use dashboard::domain::pages::PageUrl;
    ///
    /// let decision = GuardDecision::decide(false, Verification::NotChecked, RouteCategory::ProtectedDashboard);
    /// assert_eq!(decision, GuardDecision::Redirect(PageUrl::Login));
    /// ```
    #[must_use]
    pub const fn decide(
        credential_present: bool,
        verification: Verification,
        category: RouteCategory,
    ) -> Self {
        if !credential_present {
            return match category {
                RouteCategory::ProtectedDashboard => Self::Redirect(PageUrl::Login),
                RouteCategory::PublicOnboarding | RouteCategory::Other => Self::Allow,
            };
        }
        match (verification, category) {
            (Verification::Valid, RouteCategory::PublicOnboarding) => Self::Redirect(PageUrl::Home),
            (Verification::Valid, _) => Self::Allow,
            (Verification::Invalid | Verification::NotChecked, _) => Self::Redirect(PageUrl::Login),
        }
    }

    /// Stable label for logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Redirect(PageUrl::Login) => "redirect_login",
            Self::Redirect(PageUrl::Home) => "redirect_home",
            Self::Redirect(_) => "redirect",
        }
    }
}

/// `Location` for a redirect to `page` issued while handling a request whose
/// query string is `query`.
///
/// Bounces to the login page keep the original query; the home redirect
/// starts clean.
///
/// # Examples
/// ```
/// use dashboard::domain::guard::redirect_location;
/// use dashboard::domain::pages::PageUrl;
///
/// assert_eq!(redirect_location(PageUrl::Login, "groupId=4"), "/onboarding/login?groupId=4");
/// assert_eq!(redirect_location(PageUrl::Home, "next=x"), "/dashboard/home");
/// ```
#[must_use]
pub fn redirect_location(page: PageUrl, query: &str) -> String {
    match page {
        PageUrl::Login if !query.is_empty() => format!("{}?{query}", page.path()),
        _ => page.path().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::anonymous_protected(false, Verification::NotChecked, "/dashboard/home", GuardDecision::Redirect(PageUrl::Login))]
    #[case::anonymous_onboarding(false, Verification::NotChecked, "/onboarding/login", GuardDecision::Allow)]
    #[case::anonymous_other(false, Verification::NotChecked, "/about", GuardDecision::Allow)]
    #[case::valid_onboarding(true, Verification::Valid, "/onboarding/login", GuardDecision::Redirect(PageUrl::Home))]
    #[case::valid_sign_up(true, Verification::Valid, "/onboarding/sign-up", GuardDecision::Redirect(PageUrl::Home))]
    #[case::valid_protected(true, Verification::Valid, "/dashboard/group", GuardDecision::Allow)]
    #[case::valid_other(true, Verification::Valid, "/", GuardDecision::Allow)]
    #[case::invalid_protected(true, Verification::Invalid, "/dashboard/home", GuardDecision::Redirect(PageUrl::Login))]
    #[case::invalid_onboarding(true, Verification::Invalid, "/onboarding/login", GuardDecision::Redirect(PageUrl::Login))]
    #[case::invalid_other(true, Verification::Invalid, "/about", GuardDecision::Redirect(PageUrl::Login))]
    fn follows_the_access_table(
        #[case] present: bool,
        #[case] verification: Verification,
        #[case] path: &str,
        #[case] expected: GuardDecision,
    ) {
        let decision = GuardDecision::decide(present, verification, RouteCategory::classify(path));
        assert_eq!(decision, expected);
    }

    #[rstest]
    #[case("/api/auth/me", false)]
    #[case("/_next/static/chunk.js", false)]
    #[case("/_next/image", false)]
    #[case("/assets/logo.svg", false)]
    #[case("/favicon.ico", false)]
    #[case("/sw.js", false)]
    #[case("/dashboard/home", true)]
    #[case("/onboarding/login", true)]
    #[case("/", true)]
    #[case("/apiary", false)]
    fn skips_static_and_api_paths(#[case] path: &str, #[case] guarded: bool) {
        assert_eq!(is_guarded_path(path), guarded);
    }
}
