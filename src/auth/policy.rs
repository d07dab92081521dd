use crate::model::role::Role;

/// Role-gated operations. Everything not listed here is open to any
/// authenticated user acting on their own data.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Operation {
    ViewAllAttendance,
    ViewAllLeave,
    ViewPendingLeave,
    DecideLeave,
    GenerateQr,
    ViewActiveQr,
    ViewQrHistory,
    DeactivateQr,
    ListUsers,
    ViewOtherUser,
    UpdateOtherUser,
    ChangeRoleOrStatus,
    DeleteUser,
    ManageShifts,
    ViewAllShifts,
}

pub fn allows(role: Role, op: Operation) -> bool {
    use Operation::*;

    match op {
        ViewAllAttendance | ViewAllLeave | ViewPendingLeave | DecideLeave | ViewOtherUser
        | ManageShifts | ViewAllShifts => role.is_privileged(),
        GenerateQr | ViewActiveQr | ViewQrHistory | DeactivateQr | ListUsers
        | UpdateOtherUser | ChangeRoleOrStatus | DeleteUser => role == Role::Admin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Role::Employee, Operation::DecideLeave, false)]
    #[case(Role::Manager, Operation::DecideLeave, true)]
    #[case(Role::Admin, Operation::DecideLeave, true)]
    #[case(Role::Employee, Operation::ViewAllAttendance, false)]
    #[case(Role::Manager, Operation::ViewAllAttendance, true)]
    #[case(Role::Manager, Operation::GenerateQr, false)]
    #[case(Role::Admin, Operation::GenerateQr, true)]
    #[case(Role::Manager, Operation::ViewOtherUser, true)]
    #[case(Role::Manager, Operation::UpdateOtherUser, false)]
    #[case(Role::Manager, Operation::DeleteUser, false)]
    #[case(Role::Admin, Operation::DeleteUser, true)]
    #[case(Role::Employee, Operation::ManageShifts, false)]
    #[case(Role::Manager, Operation::ManageShifts, true)]
    fn role_matrix(#[case] role: Role, #[case] op: Operation, #[case] expected: bool) {
        assert_eq!(allows(role, op), expected);
    }

    #[test]
    fn admin_can_do_everything() {
        use Operation::*;
        for op in [
            ViewAllAttendance, ViewAllLeave, ViewPendingLeave, DecideLeave, GenerateQr,
            ViewActiveQr, ViewQrHistory, DeactivateQr, ListUsers, ViewOtherUser,
            UpdateOtherUser, ChangeRoleOrStatus, DeleteUser, ManageShifts, ViewAllShifts,
        ] {
            assert!(allows(Role::Admin, op), "{op:?}");
        }
    }
}
