//! Navigable page URLs and `#{key}` template interpolation.

use std::collections::HashMap;

/// Pages of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageUrl {
    /// `/onboarding/login`.
    Login,
    /// `/onboarding/sign-up`.
    SignUp,
    /// `/dashboard/home`.
    Home,
    /// `/dashboard/group`.
    Group,
    /// `/dashboard/profile`.
    Profile,
}

impl PageUrl {
    /// URL template; `#{key}` placeholders are filled by [`interpolate`].
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::Login => "/onboarding/login",
            Self::SignUp => "/onboarding/sign-up",
            Self::Home => "/dashboard/home",
            Self::Group => "/dashboard/group?groupId=#{groupId}",
            Self::Profile => "/dashboard/profile",
        }
    }

    /// Path component of the template, without any query.
    #[must_use]
    pub fn path(self) -> &'static str {
        let template = self.template();
        template.split_once('?').map_or(template, |(path, _)| path)
    }

    /// Link to a group page.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::pages::PageUrl;
    ///
    /// assert_eq!(PageUrl::group_link("12"), "/dashboard/group?groupId=12");
    /// ```
    #[must_use]
    pub fn group_link(group_id: &str) -> String {
        let values = HashMap::from([("groupId", group_id)]);
        interpolate(Self::Group.template(), &values)
    }
}

/// Replace every `#{key}` in `template` with `values[key]`.
///
/// Keys are trimmed before lookup; unknown keys become empty strings and an
/// unterminated placeholder is copied through untouched.
#[must_use]
pub fn interpolate(template: &str, values: &HashMap<&str, &str>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("#{") {
        let (before, placeholder) = rest.split_at(start);
        rendered.push_str(before);
        let body = placeholder.get(2..).unwrap_or_default();
        match body.find('}') {
            Some(end) => {
                let key = body.get(..end).unwrap_or_default().trim();
                rendered.push_str(values.get(key).copied().unwrap_or_default());
                rest = body.get(end + 1..).unwrap_or_default();
            }
            None => {
                rendered.push_str(placeholder);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);
    rendered
}
