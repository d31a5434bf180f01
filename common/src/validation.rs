//! ユーザー名/パスワードの検証

pub const MIN_USERNAME_LENGTH: usize = 4;
pub const MAX_USERNAME_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 255;

/// 検証に失敗した理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    UsernameLength,
    UsernameCharacters,
    PasswordLength,
    PasswordLowercase,
    PasswordUppercase,
    PasswordDigit,
    PasswordSymbol,
}

impl ValidationIssue {
    pub fn message(&self) -> String {
        match self {
            ValidationIssue::UsernameLength => format!(
                "Username must be between {} and {} characters",
                MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
            ),
            ValidationIssue::UsernameCharacters => {
                "Username may only contain letters and digits".to_string()
            }
            ValidationIssue::PasswordLength => format!(
                "Password must be between {} and {} characters",
                MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
            ),
            ValidationIssue::PasswordLowercase => {
                "Password must contain a lowercase letter".to_string()
            }
            ValidationIssue::PasswordUppercase => {
                "Password must contain an uppercase letter".to_string()
            }
            ValidationIssue::PasswordDigit => "Password must contain a digit".to_string(),
            ValidationIssue::PasswordSymbol => "Password must contain a symbol".to_string(),
        }
    }
}

pub fn validate_username(username: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let length = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&length) {
        issues.push(ValidationIssue::UsernameLength);
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        issues.push(ValidationIssue::UsernameCharacters);
    }
    issues
}

pub fn validate_password(password: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        issues.push(ValidationIssue::PasswordLength);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        issues.push(ValidationIssue::PasswordLowercase);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        issues.push(ValidationIssue::PasswordUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push(ValidationIssue::PasswordDigit);
    }
    if !password.chars().any(|c| c.is_ascii_punctuation()) {
        issues.push(ValidationIssue::PasswordSymbol);
    }
    issues
}
