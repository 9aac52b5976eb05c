use serde::{Deserialize, Serialize};

use crate::error::{FormErrors, ServerError};

pub const REQUIRED: &str = "This field is required.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const USERNAME_INVALID: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const EMAIL_INVALID: &str = "Enter a valid email address.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const PASSWORD_TOO_SHORT: &str = "This password is too short. It must contain at least 8 characters.";
pub const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
pub const PASSWORD_TOO_SIMILAR: &str = "The password is too similar to the username.";
pub const PASSWORD_SIMILAR_TO_EMAIL: &str = "The password is too similar to the email address.";
pub const USERNAME_RESERVED: &str = "This username is reserved.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const TWEET_MAX_LENGTH: usize = 255;

/// Names that collide with the fixed routes under `/accounts/`.
pub const RESERVED_USERNAMES: &[&str] = &["signup", "login", "logout"];

/// Passwords whose similarity ratio with an attribute reaches this are refused.
pub const MAX_PASSWORD_SIMILARITY: f64 = 0.7;

/// Field-level error key for errors that belong to the whole form.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Answer to a GET on a form route: the fields the form accepts.
#[derive(Serialize, Debug)]
pub struct FormDescriptor {
    pub form: &'static str,
    pub fields: &'static [&'static str],
}

pub const SIGNUP_FORM: FormDescriptor = FormDescriptor {
    form: "signup",
    fields: &["username", "email", "password1", "password2"],
};

pub const LOGIN_FORM: FormDescriptor = FormDescriptor {
    form: "login",
    fields: &["username", "password"],
};

pub const TWEET_FORM: FormDescriptor = FormDescriptor {
    form: "tweet",
    fields: &["content"],
};

#[derive(Deserialize, Debug, Default, Clone)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct TweetForm {
    #[serde(default)]
    pub content: String,
}

impl SignupForm {
    /// Checks everything that doesn't need the store. Returns the trimmed
    /// username and email on success.
    pub fn clean(&self) -> Result<(String, String), ServerError> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();
        let email = self.email.trim();

        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if !valid_username(username) {
            errors.add("username", USERNAME_INVALID);
        } else if RESERVED_USERNAMES.iter().any(|name| name.eq_ignore_ascii_case(username)) {
            errors.add("username", USERNAME_RESERVED);
        }

        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !valid_email(email) {
            errors.add("email", EMAIL_INVALID);
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        }

        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                for message in password_problems(&self.password2, username, email) {
                    errors.add("password2", message);
                }
            }
        }

        errors.into_result()?;
        Ok((username.to_string(), email.to_string()))
    }
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), ServerError> {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result()
    }
}

impl TweetForm {
    /// Returns the trimmed content when it is non-empty and short enough.
    pub fn clean(&self) -> Result<String, ServerError> {
        let content = self.content.trim();
        let length = content.chars().count();
        if length == 0 {
            return Err(ServerError::Validation(FormErrors::single("content", REQUIRED)));
        }
        if length > TWEET_MAX_LENGTH {
            return Err(ServerError::Validation(FormErrors::single(
                "content",
                format!("Ensure this value has at most {TWEET_MAX_LENGTH} characters (it has {length})."),
            )));
        }
        Ok(content.to_string())
    }
}

fn valid_username(username: &str) -> bool {
    username.chars().count() <= USERNAME_MAX_LENGTH
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    let labels = domain.split('.').collect::<Vec<_>>();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

fn password_problems(password: &str, username: &str, email: &str) -> Vec<&'static str> {
    let mut problems = vec![];
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        problems.push(PASSWORD_TOO_SHORT);
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push(PASSWORD_NUMERIC);
    }
    if too_similar(password, username) {
        problems.push(PASSWORD_TOO_SIMILAR);
    } else if too_similar(password, email) {
        problems.push(PASSWORD_SIMILAR_TO_EMAIL);
    }
    problems
}

/// Compares the password with the whole attribute and with each of its word-separated parts.
fn too_similar(password: &str, attribute: &str) -> bool {
    if attribute.is_empty() {
        return false;
    }
    let password = password.to_lowercase().chars().collect::<Vec<_>>();
    attribute
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
        .chain([attribute])
        .any(|part| {
            let part = part.to_lowercase().chars().collect::<Vec<_>>();
            similarity(&password, &part) >= MAX_PASSWORD_SIMILARITY
        })
}

/// Ratcliff/Obershelp ratio: twice the matched characters over the total length.
fn similarity(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a, b) as f64 / total as f64
}

// longest common block, then the same on both sides of it
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (mut best_len, mut best_a, mut best_b) = (0, 0, 0);
    let mut previous = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut current = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                current[j + 1] = previous[j] + 1;
                if current[j + 1] > best_len {
                    best_len = current[j + 1];
                    best_a = i + 1 - best_len;
                    best_b = j + 1 - best_len;
                }
            }
        }
        previous = current;
    }
    if best_len == 0 {
        return 0;
    }
    best_len
        + matching_chars(&a[..best_a], &b[..best_b])
        + matching_chars(&a[best_a + best_len..], &b[best_b + best_len..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(username: &str, email: &str, password1: &str, password2: &str) -> SignupForm {
        SignupForm {
            username: username.to_string(),
            email: email.to_string(),
            password1: password1.to_string(),
            password2: password2.to_string(),
        }
    }

    fn errors_of(result: Result<impl std::fmt::Debug, ServerError>) -> FormErrors {
        match result {
            Err(ServerError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn valid_signup_is_cleaned() {
        let form = signup(" testuser ", "test@test.com", "correcthorse", "correcthorse");
        let (username, email) = form.clean().unwrap();
        assert_eq!(username, "testuser");
        assert_eq!(email, "test@test.com");
    }

    #[test]
    fn empty_signup_reports_every_field() {
        let errors = errors_of(SignupForm::default().clean());
        for field in ["username", "email", "password1", "password2"] {
            assert_eq!(errors.errors[field], vec![REQUIRED.to_string()], "{field}");
        }
    }

    #[test]
    fn invalid_email_is_rejected() {
        for email in ["test", "test@", "@test.com", "te st@test.com", "test@test", "test@test..com"] {
            let errors = errors_of(signup("testuser", email, "correcthorse", "correcthorse").clean());
            assert_eq!(errors.errors["email"], vec![EMAIL_INVALID.to_string()], "{email}");
        }
    }

    #[test]
    fn invalid_username_is_rejected() {
        let errors = errors_of(signup("bad name!", "test@test.com", "correcthorse", "correcthorse").clean());
        assert!(errors.has("username"));

        let long = "a".repeat(USERNAME_MAX_LENGTH + 1);
        let errors = errors_of(signup(&long, "test@test.com", "correcthorse", "correcthorse").clean());
        assert!(errors.has("username"));
    }

    #[test]
    fn password_rules_report_on_confirmation_field() {
        let errors = errors_of(signup("testuser", "test@test.com", "te", "te").clean());
        assert!(errors.errors["password2"].contains(&PASSWORD_TOO_SHORT.to_string()));

        let errors = errors_of(signup("testuser", "test@test.com", "20230228", "20230228").clean());
        assert!(errors.errors["password2"].contains(&PASSWORD_NUMERIC.to_string()));

        let errors = errors_of(signup("testuser", "test@test.com", "testuser", "testuser").clean());
        assert!(errors.errors["password2"].contains(&PASSWORD_TOO_SIMILAR.to_string()));

        let errors = errors_of(signup("testuser", "test@test.com", "testpassword1", "testpassword2").clean());
        assert_eq!(errors.errors["password2"], vec![PASSWORD_MISMATCH.to_string()]);
    }

    #[test]
    fn near_miss_of_the_username_is_too_similar() {
        for password in ["tsetuser", "TestUser1", "testuser22"] {
            let errors = errors_of(signup("testuser", "alice@example.com", password, password).clean());
            assert_eq!(errors.errors["password2"], vec![PASSWORD_TOO_SIMILAR.to_string()], "{password}");
        }
    }

    #[test]
    fn email_similarity_has_its_own_message() {
        let errors = errors_of(signup("testuser", "rosalind@example.com", "rosalind9", "rosalind9").clean());
        assert_eq!(errors.errors["password2"], vec![PASSWORD_SIMILAR_TO_EMAIL.to_string()]);

        let errors = errors_of(signup("testuser", "rosalind@example.com", "Rosalind@Example", "Rosalind@Example").clean());
        assert_eq!(errors.errors["password2"], vec![PASSWORD_SIMILAR_TO_EMAIL.to_string()]);
    }

    #[test]
    fn unrelated_passwords_are_not_similar() {
        assert!(signup("testuser", "test@test.com", "correcthorse", "correcthorse").clean().is_ok());
        assert!(!too_similar("correcthorse", "testuser"));
        assert!(too_similar("tsetuser", "testuser"));
    }

    #[test]
    fn similarity_ratio() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(similarity(&chars("abcd"), &chars("abcd")), 1.0);
        assert_eq!(similarity(&chars("abcd"), &chars("wxyz")), 0.0);
        // "tuser" then "t" and "s" on the left: 7 of 8 characters match
        assert_eq!(similarity(&chars("tsetuser"), &chars("testuser")), 0.875);
    }

    #[test]
    fn route_names_are_reserved_usernames() {
        for username in ["signup", "login", "logout", "Login"] {
            let errors = errors_of(signup(username, "test@test.com", "correcthorse", "correcthorse").clean());
            assert_eq!(errors.errors["username"], vec![USERNAME_RESERVED.to_string()], "{username}");
        }
        assert!(signup("logins", "test@test.com", "correcthorse", "correcthorse").clean().is_ok());
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = errors_of(LoginForm { username: "testuser".to_string(), password: String::new() }.clean());
        assert!(errors.has("password"));
        assert!(!errors.has("username"));
    }

    #[test]
    fn tweet_length_boundary() {
        let at_limit = TweetForm { content: "x".repeat(TWEET_MAX_LENGTH) };
        assert_eq!(at_limit.clean().unwrap().chars().count(), TWEET_MAX_LENGTH);

        let over = TweetForm { content: "x".repeat(TWEET_MAX_LENGTH + 1) };
        let errors = errors_of(over.clean());
        assert_eq!(
            errors.errors["content"],
            vec!["Ensure this value has at most 255 characters (it has 256).".to_string()]
        );
    }

    #[test]
    fn blank_tweet_is_required() {
        let errors = errors_of(TweetForm { content: "   ".to_string() }.clean());
        assert_eq!(errors.errors["content"], vec![REQUIRED.to_string()]);
    }

    #[test]
    fn tweet_length_counts_characters_not_bytes() {
        let content = "あ".repeat(TWEET_MAX_LENGTH);
        assert!(TweetForm { content }.clean().is_ok());
    }
}
