use serde::{Deserialize, Serialize};

use crate::{entity::StaffRole, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Administrator,
  Officer,
  Customer,
}

impl From<StaffRole> for Role {
  fn from(role: StaffRole) -> Self {
    match role {
      StaffRole::Administrator => Role::Administrator,
      StaffRole::Officer => Role::Officer,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
  ManageStaff,
  ManageTariffs,
  ManagePaymentMethods,
  ManageCustomers,
  ManageInvoices,
  VerifyPayments,
  ViewDashboard,
  ExportCustomers,
  ManageOwnAccount,
  ViewOwnBills,
  SubmitPayment,
}

/// Whoever performs a write; stamped into verifier fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id: i32,
  pub role: Role,
}

impl Actor {
  pub fn new(id: i32, role: Role) -> Self {
    Self { id, role }
  }

  /// Operator running the CLI.
  pub fn system() -> Self {
    Self::new(0, Role::Administrator)
  }

  pub fn ensure(&self, action: Action) -> Result<()> {
    if allows(self.role, action) {
      Ok(())
    } else {
      warn!("{:?} #{} denied {:?}", self.role, self.id, action);
      Err(Error::Forbidden(action))
    }
  }

  pub fn is_staff(&self) -> bool {
    matches!(self.role, Role::Administrator | Role::Officer)
  }
}

pub fn allows(role: Role, action: Action) -> bool {
  use Action::*;

  match role {
    Role::Administrator => !matches!(action, ViewOwnBills | SubmitPayment),
    Role::Officer => matches!(
      action,
      ManageCustomers
        | ManageInvoices
        | VerifyPayments
        | ViewDashboard
        | ExportCustomers
        | ManageOwnAccount
    ),
    Role::Customer => matches!(action, ViewOwnBills | SubmitPayment),
  }
}

#[cfg(test)]
mod tests {
  use super::{Action::*, *};

  #[test]
  fn test_admin_only_actions() {
    for action in [ManageStaff, ManageTariffs, ManagePaymentMethods] {
      assert!(allows(Role::Administrator, action));
      assert!(!allows(Role::Officer, action));
      assert!(!allows(Role::Customer, action));
    }
  }

  #[test]
  fn test_shared_staff_actions() {
    for action in [ManageCustomers, ManageInvoices, VerifyPayments, ViewDashboard]
    {
      assert!(allows(Role::Administrator, action));
      assert!(allows(Role::Officer, action));
      assert!(!allows(Role::Customer, action));
    }
  }

  #[test]
  fn test_customer_actions() {
    assert!(allows(Role::Customer, SubmitPayment));
    assert!(allows(Role::Customer, ViewOwnBills));
    assert!(!allows(Role::Administrator, SubmitPayment));
  }

  #[test]
  fn test_ensure_reports_action() {
    let officer = Actor::new(2, Role::Officer);
    assert!(matches!(
      officer.ensure(ManageTariffs),
      Err(Error::Forbidden(ManageTariffs))
    ));
    assert!(officer.ensure(VerifyPayments).is_ok());
  }
}
