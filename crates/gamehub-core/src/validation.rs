//! Form field validation for the sign-up, profile, game and comment forms.
//!
//! Every rule returns `None` when the value is acceptable and a message for
//! the user otherwise.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};

use crate::models::{GameUpdate, NewGame, PlatformLink, ProfileUpdate, RegisterRequest};

/// Minimum age to create an account
const MIN_AGE_YEARS: i32 = 16;

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 30;
const DESCRIPTION_MAX_LEN: usize = 300;
const EMAIL_LOCAL_MIN_LEN: usize = 3;
const EMAIL_LOCAL_MAX_LEN: usize = 55;
const PASSWORD_MIN_LEN: usize = 6;
const MAX_GAME_PRICE: f64 = 300.0;
const COMMENT_MIN_LEN: usize = 2;
const COMMENT_MAX_LEN: usize = 120;
const EDITED_COMMENT_MAX_LEN: usize = 60;

/// Store platforms a game can link to.
pub const GAME_PLATFORMS: [&str; 4] = ["Steam", "EA", "Epic Games", "Xbox"];

/// Social networks a profile can link to.
pub const SOCIAL_NETWORKS: [&str; 5] = ["Facebook", "Youtube", "X", "Github", "LinkedIn"];

// ============================================================================
// Field rules
// ============================================================================

/// Letters, digits and whitespace only, length in `min..=max`, no leading
/// whitespace. Trailing whitespace is accepted.
fn is_plain_text(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    (min..=max).contains(&len)
        && !value.starts_with(char::is_whitespace)
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
}

pub fn validate_name(name: &str) -> Option<String> {
    if is_plain_text(name, NAME_MIN_LEN, NAME_MAX_LEN) {
        None
    } else {
        Some(
            "Name must be between 2 and 30 characters long and contain only letters, numbers, and spaces."
                .to_string(),
        )
    }
}

pub fn validate_game_name(name: &str) -> Option<String> {
    validate_name(name)
}

pub fn validate_description(description: &str) -> Option<String> {
    if is_plain_text(description, NAME_MIN_LEN, DESCRIPTION_MAX_LEN) {
        None
    } else {
        Some(
            "Description must be between 2 and 300 characters long and contain only letters, numbers, and spaces."
                .to_string(),
        )
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let local_len = local.chars().count();
    let no_space_or_at = |s: &str| !s.chars().any(|c| c.is_whitespace() || c == '@');

    (EMAIL_LOCAL_MIN_LEN..=EMAIL_LOCAL_MAX_LEN).contains(&local_len)
        && no_space_or_at(local)
        && no_space_or_at(domain)
        && domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn validate_email(email: &str) -> Option<String> {
    if is_valid_email(email) {
        None
    } else {
        Some("Email must be between 3 and 55 characters long and in a valid format.".to_string())
    }
}

pub fn validate_password(password: &str) -> Option<String> {
    let long_enough = password.chars().count() >= PASSWORD_MIN_LEN;
    let single_line = !password.contains(['\n', '\r']);
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_symbol = password.chars().any(|c| !(c.is_ascii_alphanumeric() || c == '_'));

    if long_enough && single_line && has_lower && has_upper && has_symbol {
        None
    } else {
        Some(
            "Password must be at least 6 characters long and include at least one uppercase letter, one lowercase letter, and one special character."
                .to_string(),
        )
    }
}

pub fn validate_confirm_password(confirm_password: &str, password: &str) -> Option<String> {
    if confirm_password == password {
        None
    } else {
        Some("Passwords do not match.".to_string())
    }
}

/// Parse a birth date as `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Whole years between `birth` and `today`.
fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

pub fn validate_birth_date_on(birth_date: &str, today: NaiveDate) -> Option<String> {
    let Some(birth) = parse_date(birth_date) else {
        return Some("Invalid date.".to_string());
    };
    if age_on(birth, today) >= MIN_AGE_YEARS {
        None
    } else {
        Some("You must be at least 16 years old.".to_string())
    }
}

pub fn validate_birth_date(birth_date: &str) -> Option<String> {
    validate_birth_date_on(birth_date, chrono::Local::now().date_naive())
}

pub fn validate_price(price: &str) -> Option<String> {
    let (whole, fraction) = match price.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (price, None),
    };
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    let valid = digits(whole) && fraction.map_or(true, |f| digits(f) && f.len() <= 2);

    if valid {
        None
    } else {
        Some("Invalid price format.".to_string())
    }
}

/// Price format plus the catalog's price ceiling.
pub fn validate_game_price(price: &str) -> Option<String> {
    if let Some(e) = validate_price(price) {
        return Some(e);
    }
    match price.parse::<f64>() {
        Ok(value) if value <= MAX_GAME_PRICE => None,
        _ => Some("Price must be between 0 and 300".to_string()),
    }
}

pub fn validate_release_date(release_date: &str) -> Option<String> {
    if release_date.trim().is_empty() {
        Some("Release date is required".to_string())
    } else if parse_date(release_date).is_none() {
        Some("Valid Release Date is required.".to_string())
    } else {
        None
    }
}

fn comment_length_ok(description: &str, max: usize) -> bool {
    (COMMENT_MIN_LEN..=max).contains(&description.chars().count())
}

/// Rule for a newly posted comment.
pub fn validate_comment(description: &str) -> Option<String> {
    if comment_length_ok(description, COMMENT_MAX_LEN) {
        None
    } else {
        Some("Description must be between 2-120 characters long.".to_string())
    }
}

/// Edited comments are held to a shorter limit than new ones.
pub fn validate_comment_edit(description: &str) -> Option<String> {
    if comment_length_ok(description, EDITED_COMMENT_MAX_LEN) {
        None
    } else {
        Some("Description must be between 2-60 characters long.".to_string())
    }
}

// ============================================================================
// Platform links
// ============================================================================

/// Optional subdomain and host a platform's links must point at.
fn platform_host(platform: &str) -> Option<(&'static str, &'static str)> {
    let host = match platform {
        "LinkedIn" => ("www.", "linkedin.com"),
        "Facebook" => ("www.", "facebook.com"),
        "Github" => ("www.", "github.com"),
        "Twitter" => ("www.", "twitter.com"),
        "Youtube" => ("www.", "youtube.com"),
        "Discord Server" => ("www.", "discord.com"),
        "Steam" => ("store.", "steampowered.com"),
        "EA" => ("www.", "ea.com"),
        "Epic Games" => ("www.", "epicgames.com"),
        "Xbox" => ("www.", "microsoft.com"),
        _ => return None,
    };
    Some(host)
}

fn matches_platform(url: &str, subdomain: &str, host: &str) -> bool {
    if url.contains(['\n', '\r']) {
        return false;
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let on_host = |s: &str| s.strip_prefix(host).is_some_and(|path| path.starts_with('/'));

    on_host(rest) || rest.strip_prefix(subdomain).is_some_and(on_host)
}

/// Validate a link for `platform`. An empty URL means "no link" and is
/// accepted; unknown platforms accept any URL.
pub fn validate_url(url: &str, platform: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    match platform_host(platform) {
        Some((subdomain, host)) if !matches_platform(url, subdomain, host) => {
            Some(format!("Invalid {} url format.", platform))
        }
        _ => None,
    }
}

// ============================================================================
// Sign-up form
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub birth_date: String,
    /// Local image file, uploaded before registering
    pub profile_image: Option<PathBuf>,
    pub social_networks: Vec<PlatformLink>,
}

/// Per-field errors of a sign-up form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpErrors {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub birth_date: Option<String>,
    /// (platform, error) for each rejected social link
    pub social_networks: Vec<(String, String)>,
}

impl SignUpErrors {
    pub fn has_errors(&self) -> bool {
        self.name.is_some()
            || self.email.is_some()
            || self.password.is_some()
            || self.confirm_password.is_some()
            || self.birth_date.is_some()
            || !self.social_networks.is_empty()
    }

    /// All messages, labelled by field.
    pub fn messages(&self) -> Vec<String> {
        let fields = [
            ("name", &self.name),
            ("email", &self.email),
            ("password", &self.password),
            ("confirm password", &self.confirm_password),
            ("birth date", &self.birth_date),
        ];
        fields
            .into_iter()
            .filter_map(|(field, error)| error.as_ref().map(|e| format!("{}: {}", field, e)))
            .chain(
                self.social_networks
                    .iter()
                    .map(|(platform, e)| format!("{}: {}", platform, e)),
            )
            .collect()
    }
}

impl SignUpForm {
    /// Social links the user actually filled in.
    fn filled_social_networks(&self) -> impl Iterator<Item = &PlatformLink> {
        self.social_networks.iter().filter(|link| !link.url.is_empty())
    }

    pub fn validate(&self) -> SignUpErrors {
        SignUpErrors {
            name: validate_name(&self.name),
            email: validate_email(&self.email),
            password: validate_password(&self.password),
            confirm_password: validate_confirm_password(&self.confirm_password, &self.password),
            birth_date: validate_birth_date(&self.birth_date),
            social_networks: self
                .filled_social_networks()
                .filter_map(|link| {
                    validate_url(&link.url, &link.platform).map(|e| (link.platform.clone(), e))
                })
                .collect(),
        }
    }

    /// `profile_image` is the stored name of the uploaded image.
    pub fn to_request(&self, profile_image: Option<String>) -> RegisterRequest {
        RegisterRequest {
            name: self.name.clone(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            birth_date: self.birth_date.trim().to_string(),
            profile_image,
            social_networks: self.filled_social_networks().cloned().collect(),
        }
    }
}

// ============================================================================
// Game and profile forms
// ============================================================================

/// Field errors of a form, in the order the fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: Vec<(String, String)>,
}

impl FormErrors {
    fn check(&mut self, field: &str, error: Option<String>) {
        if let Some(e) = error {
            self.errors.push((field.to_string(), e));
        }
    }

    fn check_links(&mut self, links: &[PlatformLink]) {
        for link in links {
            let error = if link.url.trim().is_empty() {
                Some("All chosen platform URLs must be provided.".to_string())
            } else {
                validate_url(&link.url, &link.platform)
            };
            self.check(&link.platform, error);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The error reported for `field`, if any.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, e)| e.as_str())
    }

    /// All messages, labelled by field.
    pub fn messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|(field, e)| format!("{}: {}", field, e))
            .collect()
    }
}

/// A new game as entered by its developer.
#[derive(Debug, Clone, Default)]
pub struct GameForm {
    pub name: String,
    pub price: String,
    /// Local cover image, uploaded before the game is created
    pub image: Option<PathBuf>,
    pub description: String,
    pub release_date: String,
    pub categories: Vec<String>,
    pub platform_links: Vec<PlatformLink>,
}

impl GameForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        errors.check("name", validate_game_name(&self.name));
        errors.check("price", validate_game_price(self.price.trim()));
        if self.image.is_none() {
            errors.check("image", Some("An image is required".to_string()));
        }
        errors.check("description", validate_description(&self.description));
        errors.check("release date", validate_release_date(&self.release_date));
        if self.categories.is_empty() {
            errors.check("categories", Some("At least one category is required".to_string()));
        }
        errors.check_links(&self.platform_links);
        errors
    }

    /// Build the request body once the form is valid and the image is stored.
    pub fn to_new_game(&self, image: String, developer_id: String) -> NewGame {
        NewGame {
            name: self.name.clone(),
            price: self.price.trim().parse().unwrap_or_default(),
            image,
            description: self.description.clone(),
            developer_id,
            platform_links: self.platform_links.clone(),
            release_date: self.release_date.trim().to_string(),
            categories: self.categories.clone(),
        }
    }
}

/// Changes to an existing game. Empty fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct GameEdit {
    pub name: String,
    pub price: String,
    pub image: Option<PathBuf>,
    pub description: String,
    pub release_date: String,
    pub categories: Vec<String>,
    pub platform_links: Vec<PlatformLink>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| value.to_string())
}

impl GameEdit {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
            && self.price.trim().is_empty()
            && self.image.is_none()
            && self.description.trim().is_empty()
            && self.release_date.trim().is_empty()
            && self.categories.is_empty()
            && self.platform_links.is_empty()
    }

    /// Only the fields being changed are checked.
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if let Some(name) = non_empty(&self.name) {
            errors.check("name", validate_game_name(&name));
        }
        if let Some(price) = non_empty(&self.price) {
            errors.check("price", validate_game_price(price.trim()));
        }
        if let Some(description) = non_empty(&self.description) {
            errors.check("description", validate_description(&description));
        }
        if let Some(date) = non_empty(&self.release_date) {
            errors.check("release date", validate_release_date(&date));
        }
        errors.check_links(&self.platform_links);
        errors
    }

    pub fn to_update(&self, image: Option<String>) -> GameUpdate {
        GameUpdate {
            name: non_empty(&self.name),
            price: non_empty(&self.price).and_then(|p| p.trim().parse().ok()),
            image,
            description: non_empty(&self.description),
            release_date: non_empty(&self.release_date).map(|d| d.trim().to_string()),
            categories: (!self.categories.is_empty()).then(|| self.categories.clone()),
            platform_links: (!self.platform_links.is_empty()).then(|| self.platform_links.clone()),
        }
    }
}

/// Changes to the signed-in user's profile. Empty fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub name: String,
    pub birth_date: String,
    pub image: Option<PathBuf>,
    pub social_networks: Vec<PlatformLink>,
}

impl ProfileEdit {
    fn filled_social_networks(&self) -> Vec<PlatformLink> {
        self.social_networks
            .iter()
            .filter(|link| !link.url.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if let Some(name) = non_empty(&self.name) {
            errors.check("name", validate_name(&name));
        }
        if let Some(date) = non_empty(&self.birth_date) {
            errors.check("birth date", validate_birth_date(&date));
        }
        errors.check_links(&self.filled_social_networks());
        errors
    }

    pub fn to_update(&self, profile_image: Option<String>) -> ProfileUpdate {
        let links = self.filled_social_networks();
        ProfileUpdate {
            name: non_empty(&self.name),
            birth_date: non_empty(&self.birth_date).map(|d| d.trim().to_string()),
            profile_image,
            social_networks: (!links.is_empty()).then_some(links),
        }
    }
}
