use crate::db::entities::vip_requests::VipStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a VIP request cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: VipStatus,
    pub to: VipStatus,
}

impl VipStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            VipStatus::Completed | VipStatus::Denied | VipStatus::Cancelled
        )
    }

    /// Requests only move forward; `completed`, `denied` and `cancelled` are final.
    pub fn can_transition_to(self, next: VipStatus) -> bool {
        use VipStatus::*;

        match self {
            Pending => matches!(
                next,
                EmailSent | AccountCreated | Completed | Denied | Cancelled
            ),
            EmailSent => matches!(next, AccountCreated | Completed | Denied | Cancelled),
            AccountCreated => matches!(next, Completed | Denied | Cancelled),
            Completed | Denied | Cancelled => false,
        }
    }

    pub fn transition(self, next: VipStatus) -> Result<VipStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

/// Status filter offered by `/vip requests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum StatusFilter {
    #[name = "pending"]
    Pending,
    #[name = "email_sent"]
    EmailSent,
    #[name = "account_created"]
    AccountCreated,
    #[name = "completed"]
    Completed,
    #[name = "denied"]
    Denied,
    #[name = "cancelled"]
    Cancelled,
    #[name = "all"]
    All,
}

impl StatusFilter {
    pub fn status(self) -> Option<VipStatus> {
        match self {
            StatusFilter::Pending => Some(VipStatus::Pending),
            StatusFilter::EmailSent => Some(VipStatus::EmailSent),
            StatusFilter::AccountCreated => Some(VipStatus::AccountCreated),
            StatusFilter::Completed => Some(VipStatus::Completed),
            StatusFilter::Denied => Some(VipStatus::Denied),
            StatusFilter::Cancelled => Some(VipStatus::Cancelled),
            StatusFilter::All => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn test_forward_moves_are_allowed() {
        assert!(VipStatus::Pending.can_transition_to(VipStatus::EmailSent));
        assert!(VipStatus::Pending.can_transition_to(VipStatus::Completed));
        assert!(VipStatus::EmailSent.can_transition_to(VipStatus::AccountCreated));
        assert!(VipStatus::AccountCreated.can_transition_to(VipStatus::Completed));
        assert!(VipStatus::AccountCreated.can_transition_to(VipStatus::Cancelled));
    }

    #[test]
    fn test_backward_and_self_moves_are_rejected() {
        assert!(!VipStatus::AccountCreated.can_transition_to(VipStatus::EmailSent));
        assert!(!VipStatus::EmailSent.can_transition_to(VipStatus::Pending));
        assert!(!VipStatus::Pending.can_transition_to(VipStatus::Pending));
    }

    #[test]
    fn test_terminal_states_never_move() {
        for from in VipStatus::iter().filter(|s| s.is_terminal()) {
            for to in VipStatus::iter() {
                assert_eq!(
                    from.transition(to),
                    Err(TransitionError { from, to }),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_error_message_names_both_states() {
        let err = VipStatus::Denied.transition(VipStatus::Completed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "a VIP request cannot move from denied to completed"
        );
    }
}
