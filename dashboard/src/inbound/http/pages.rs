//! Placeholder page shells for the onboarding and dashboard routes.
//!
//! The edge server only needs something to hand the browser once the session
//! guard lets a navigation through; rendering lives elsewhere.

use actix_web::http::header::{self, ContentType};
use actix_web::{HttpResponse, get};

use crate::domain::pages::PageUrl;

fn shell(page: PageUrl, title: &str) -> HttpResponse {
    let body = format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body><main id=\"app\" data-page=\"{}\"></main></body>\n</html>\n",
        page.path()
    );
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(body)
}

/// `/` forwards to the dashboard home; the guard decides from there.
#[get("/")]
pub async fn root() -> HttpResponse {
    HttpResponse::TemporaryRedirect()
        .insert_header((header::LOCATION, PageUrl::Home.path()))
        .finish()
}

/// Login form.
#[get("/onboarding/login")]
pub async fn login() -> HttpResponse {
    shell(PageUrl::Login, "Log in")
}

/// Registration form.
#[get("/onboarding/sign-up")]
pub async fn sign_up() -> HttpResponse {
    shell(PageUrl::SignUp, "Sign up")
}

/// Group overview.
#[get("/dashboard/home")]
pub async fn home() -> HttpResponse {
    shell(PageUrl::Home, "Groups")
}

/// Expenses, balances and members of one group (`?groupId=`).
#[get("/dashboard/group")]
pub async fn group() -> HttpResponse {
    shell(PageUrl::Group, "Group")
}

/// Signed-in user's profile.
#[get("/dashboard/profile")]
pub async fn profile() -> HttpResponse {
    shell(PageUrl::Profile, "Profile")
}
