//! Sign-in form.

use super::{FieldErrors, FormController, FormKind, FormState};
use crate::validation::{validate_email, validate_required};

/// Credentials handed to the auth provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    state: FormState,
}

impl LoginForm {
    pub fn new() -> Self {
        let mut form = Self {
            state: FormState::default(),
        };
        form.reset();
        form
    }
}

impl Default for LoginForm {
    fn default() -> Self {
        Self::new()
    }
}

impl FormController for LoginForm {
    type Payload = Credentials;

    const KIND: FormKind = FormKind::Login;

    fn state(&self) -> &FormState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    fn defaults(&self) -> Vec<(&'static str, String)> {
        vec![("email", String::new()), ("password", String::new())]
    }

    fn prepare(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = self.state.value("email");
        let password = self.state.value("password");

        if !validate_required(email) {
            errors.insert("email".into(), "Email is required".into());
        } else if !validate_email(email) {
            errors.insert("email".into(), "Invalid email format".into());
        }
        if !validate_required(password) {
            errors.insert("password".into(), "Password is required".into());
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Credentials {
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_form_reports_both_fields() {
        let errors = LoginForm::new().prepare().unwrap_err();
        assert_eq!(errors["email"], "Email is required");
        assert_eq!(errors["password"], "Password is required");
    }

    #[test]
    fn email_shape_is_checked() {
        let mut form = LoginForm::new();
        form.set_field("email", "a@b");
        form.set_field("password", "whatever");
        let errors = form.prepare().unwrap_err();
        assert_eq!(errors["email"], "Invalid email format");
        assert!(!errors.contains_key("password"));
    }

    #[test]
    fn valid_credentials_pass_through() {
        let mut form = LoginForm::new();
        form.set_field("email", "me@example.com");
        form.set_field("password", "x");
        assert_eq!(
            form.prepare().unwrap(),
            Credentials {
                email: "me@example.com".to_string(),
                password: "x".to_string(),
            }
        );
    }
}
