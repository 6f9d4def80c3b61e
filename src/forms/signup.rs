//! Sign-up form.

use super::{FieldErrors, FormController, FormKind, FormState};
use crate::validation::{
    validate_email, validate_password, validate_password_match, validate_required,
};

/// New account request for the auth provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignupForm {
    state: FormState,
}

impl SignupForm {
    pub fn new() -> Self {
        let mut form = Self {
            state: FormState::default(),
        };
        form.reset();
        form
    }
}

impl Default for SignupForm {
    fn default() -> Self {
        Self::new()
    }
}

impl FormController for SignupForm {
    type Payload = Registration;

    const KIND: FormKind = FormKind::Signup;

    fn state(&self) -> &FormState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    fn defaults(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", String::new()),
            ("email", String::new()),
            ("password", String::new()),
            ("confirm_password", String::new()),
        ]
    }

    fn prepare(&self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.state.value("name");
        let email = self.state.value("email");
        let password = self.state.value("password");
        let confirm = self.state.value("confirm_password");

        if !validate_required(name) {
            errors.insert("name".into(), "Name is required".into());
        }
        if !validate_required(email) {
            errors.insert("email".into(), "Email is required".into());
        } else if !validate_email(email) {
            errors.insert("email".into(), "Invalid email format".into());
        }
        if !validate_required(password) {
            errors.insert("password".into(), "Password is required".into());
        } else if !validate_password(password) {
            errors.insert(
                "password".into(),
                "Password must be at least 8 characters".into(),
            );
        }
        if !validate_password_match(password, confirm) {
            errors.insert("confirm_password".into(), "Passwords do not match".into());
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Registration {
            name: name.trim().to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })
    }
}
