// ── Grant subscription wizard ──
//
// Three-step form state for granting a subscription: user details, plan
// selection, review. Each step validates only its own fields before the
// wizard advances; submission re-validates everything.

use strum::{Display, EnumIter};

use kdist_api::models::{GrantSubscriptionData, GrantSubscriptionRequest, Plan};

use crate::console::Console;
use crate::error::CoreError;

pub const MIN_INVITE_CODE_LEN: usize = 3;
pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum WizardStep {
    #[strum(to_string = "User Details")]
    UserDetails,
    #[strum(to_string = "Select Plan")]
    SelectPlan,
    #[strum(to_string = "Review & Submit")]
    Review,
}

impl WizardStep {
    fn next(self) -> Self {
        match self {
            Self::UserDetails => Self::SelectPlan,
            Self::SelectPlan | Self::Review => Self::Review,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::UserDetails | Self::SelectPlan => Self::UserDetails,
            Self::Review => Self::SelectPlan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "camelCase")]
pub enum Field {
    Email,
    InviteCode,
    PlanPid,
    Quantity,
}

/// One failed rule, shaped for inline form feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

/// Form state for one grant.
#[derive(Debug, Clone)]
pub struct GrantWizard {
    step: WizardStep,
    pub email: String,
    pub invite_code: String,
    pub plan: Option<Plan>,
    pub quantity: u32,
    pub dry_run: bool,
}

impl Default for GrantWizard {
    fn default() -> Self {
        Self {
            step: WizardStep::UserDetails,
            email: String::new(),
            invite_code: String::new(),
            plan: None,
            quantity: MIN_QUANTITY,
            dry_run: false,
        }
    }
}

impl GrantWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Fill the invite code from the distributor's latest code, unless the
    /// user already typed one.
    pub fn prefill_invite_code(&mut self, latest: &str) {
        if self.invite_code.trim().is_empty() && !latest.is_empty() {
            latest.clone_into(&mut self.invite_code);
        }
    }

    pub fn select_plan(&mut self, plan: Plan) {
        self.plan = Some(plan);
    }

    /// Validate the current step and advance if it passes.
    pub fn next(&mut self) -> Result<WizardStep, Vec<FieldError>> {
        let errors = self.validate_step(self.step);
        if !errors.is_empty() {
            return Err(errors);
        }
        self.step = self.step.next();
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        self.step = self.step.prev();
        self.step
    }

    /// Amount due in currency units: `price * quantity / 100`.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn total(&self) -> f64 {
        self.plan.as_ref().map_or(0.0, |p| {
            (p.price as f64) * f64::from(self.quantity) / 100.0
        })
    }

    fn validate_step(&self, step: WizardStep) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match step {
            WizardStep::UserDetails => {
                errors.extend(validate_email(&self.email));
                errors.extend(validate_invite_code(&self.invite_code));
            }
            WizardStep::SelectPlan => {
                if self.plan.is_none() {
                    errors.push(FieldError {
                        field: Field::PlanPid,
                        message: "Please select a plan",
                    });
                }
            }
            WizardStep::Review => {}
        }
        errors
    }

    /// Every rule across every step.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = self.validate_step(WizardStep::UserDetails);
        errors.extend(self.validate_step(WizardStep::SelectPlan));
        errors.extend(validate_quantity(self.quantity));
        errors
    }

    /// The request this form describes, if every field is valid.
    pub fn request(&self) -> Result<GrantSubscriptionRequest, Vec<FieldError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        let plan_pid = self.plan.as_ref().map(|p| p.pid.clone()).unwrap_or_default();
        Ok(GrantSubscriptionRequest {
            email: self.email.trim().to_owned(),
            plan_pid,
            quantity: self.quantity,
            invite_code: Some(self.invite_code.trim().to_owned()),
            dry_run: self.dry_run.then_some(true),
        })
    }

    /// Submit through the console. On success the wizard resets to its
    /// first step; on failure every field stays as entered.
    pub async fn submit(&mut self, console: &Console) -> Result<GrantSubscriptionData, CoreError> {
        let req = self.request().map_err(|errors| CoreError::ValidationFailed {
            message: errors
                .iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; "),
        })?;
        let data = console.grant_subscription(&req).await?;
        *self = Self::default();
        Ok(data)
    }
}

// ── Field rules ──────────────────────────────────────────────────────

fn validate_email(email: &str) -> Option<FieldError> {
    let email = email.trim();
    let message = if email.is_empty() {
        "Email is required"
    } else if !is_valid_email(email) {
        "Please enter a valid email address"
    } else {
        return None;
    };
    Some(FieldError {
        field: Field::Email,
        message,
    })
}

fn validate_invite_code(code: &str) -> Option<FieldError> {
    let code = code.trim();
    let message = if code.is_empty() {
        "Invite code is required"
    } else if code.chars().count() < MIN_INVITE_CODE_LEN {
        "Invite code must be at least 3 characters"
    } else {
        return None;
    };
    Some(FieldError {
        field: Field::InviteCode,
        message,
    })
}

fn validate_quantity(quantity: u32) -> Option<FieldError> {
    let message = if quantity < MIN_QUANTITY {
        "Quantity must be at least 1"
    } else if quantity > MAX_QUANTITY {
        "Quantity cannot exceed 12"
    } else {
        return None;
    };
    Some(FieldError {
        field: Field::Quantity,
        message,
    })
}

/// `local@domain.tld`: one `@`, no whitespace, a dot inside the domain
/// with characters on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn plan(price: i64) -> Plan {
        serde_json::from_value(json!({
            "pid": "p-month", "label": "Monthly", "price": price, "originPrice": price,
            "month": 1, "isActive": true
        }))
        .unwrap()
    }

    fn filled() -> GrantWizard {
        let mut w = GrantWizard::new();
        w.email = "buyer@example.com".into();
        w.invite_code = "ABC".into();
        w.select_plan(plan(990));
        w.quantity = 3;
        w
    }

    #[test]
    fn first_step_checks_only_user_fields() {
        let mut w = GrantWizard::new();
        let errors = w.next().unwrap_err();
        assert_eq!(
            errors,
            vec![
                FieldError {
                    field: Field::Email,
                    message: "Email is required"
                },
                FieldError {
                    field: Field::InviteCode,
                    message: "Invite code is required"
                },
            ]
        );
        assert_eq!(w.step(), WizardStep::UserDetails);

        w.email = "buyer@example.com".into();
        w.invite_code = "ABC".into();
        assert_eq!(w.next().unwrap(), WizardStep::SelectPlan);
    }

    #[test]
    fn plan_step_requires_a_plan() {
        let mut w = GrantWizard::new();
        w.email = "buyer@example.com".into();
        w.invite_code = "ABC".into();
        w.next().unwrap();

        let errors = w.next().unwrap_err();
        assert_eq!(errors[0].field, Field::PlanPid);

        w.select_plan(plan(100));
        assert_eq!(w.next().unwrap(), WizardStep::Review);
        assert_eq!(w.back(), WizardStep::SelectPlan);
        assert_eq!(w.back(), WizardStep::UserDetails);
        assert_eq!(w.back(), WizardStep::UserDetails);
    }

    #[test]
    fn short_invite_code_and_bad_email_are_rejected() {
        let mut w = GrantWizard::new();
        w.email = "not-an-email".into();
        w.invite_code = "AB".into();
        let messages: Vec<_> = w.next().unwrap_err().iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec![
                "Please enter a valid email address",
                "Invite code must be at least 3 characters"
            ]
        );
    }

    #[test]
    fn quantity_bounds() {
        let mut w = filled();
        w.quantity = 0;
        assert_eq!(w.request().unwrap_err()[0].message, "Quantity must be at least 1");
        w.quantity = 13;
        assert_eq!(w.request().unwrap_err()[0].message, "Quantity cannot exceed 12");
        w.quantity = 12;
        assert!(w.request().is_ok());
    }

    #[test]
    fn prefill_only_fills_an_empty_code() {
        let mut w = GrantWizard::new();
        w.prefill_invite_code("LATEST1");
        assert_eq!(w.invite_code, "LATEST1");

        w.invite_code = "MINE".into();
        w.prefill_invite_code("LATEST2");
        assert_eq!(w.invite_code, "MINE");
    }

    #[test]
    fn total_is_price_times_quantity_in_units() {
        let w = filled();
        assert!((w.total() - 29.7).abs() < 1e-9);
        assert!(GrantWizard::new().total().abs() < f64::EPSILON);
    }

    #[test]
    fn request_trims_and_carries_dry_run() {
        let mut w = filled();
        w.email = "  buyer@example.com ".into();
        w.dry_run = true;
        let req = w.request().unwrap();
        assert_eq!(req.email, "buyer@example.com");
        assert_eq!(req.plan_pid, "p-month");
        assert_eq!(req.quantity, 3);
        assert_eq!(req.invite_code.as_deref(), Some("ABC"));
        assert_eq!(req.dry_run, Some(true));

        w.dry_run = false;
        assert_eq!(w.request().unwrap().dry_run, None);
    }

    #[test]
    fn email_shapes() {
        for ok in ["a@b.co", "first.last+tag@sub.example.org"] {
            assert!(is_valid_email(ok), "{ok}");
        }
        for bad in ["", "a", "a@", "@b.co", "a@b", "a@.co", "a@b.", "a b@c.d", "a@b@c.d"] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }
}
