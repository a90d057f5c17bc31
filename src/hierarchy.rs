//! Organisational hierarchy queries over the reports-to forest.
//!
//! Assignment authorisation on site follows the management chain: a user may
//! act on themself and on anyone in their management subtree. The reports-to
//! data is expected to form a forest, but nothing enforces that at the edges
//! of the system, so every traversal here carries a visited set and treats
//! malformed graphs (cycles, self-loops, shared descendants) as terminating,
//! never as errors.

use std::collections::HashSet;

use crate::user::User;

/// Whether `current_id` may assign work to `target_id`.
///
/// True when the IDs are equal, or when `target_id` lies in the management
/// subtree rooted at `current_id`. An unknown target or a malformed
/// reports-to graph degrades to `false`.
pub fn can_assign(current_id: u64, target_id: u64, users: &[User]) -> bool {
    if current_id == target_id {
        return true;
    }
    let mut visited = HashSet::new();
    search_subtree(current_id, target_id, users, &mut visited)
}

fn search_subtree(manager_id: u64, target_id: u64, users: &[User], visited: &mut HashSet<u64>) -> bool {
    for sub in users.iter().filter(|u| u.reports_to == Some(manager_id)) {
        if !visited.insert(sub.id) {
            continue;
        }
        if sub.id == target_id {
            return true;
        }
        if search_subtree(sub.id, target_id, users, visited) {
            return true;
        }
    }
    false
}

/// A manager's team for assignment pickers: the manager plus their direct
/// reports.
pub fn team_members(manager_id: u64, users: &[User]) -> Vec<&User> {
    users
        .iter()
        .filter(|u| u.id == manager_id || u.reports_to == Some(manager_id))
        .collect()
}

/// Roots of the organisation forest: users with no manager, or whose manager
/// reference dangles.
pub fn org_roots(users: &[User]) -> Vec<&User> {
    users
        .iter()
        .filter(|u| match u.reports_to {
            None => true,
            Some(m) => m == u.id || !users.iter().any(|o| o.id == m),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Role;

    fn user(id: u64, reports_to: Option<u64>) -> User {
        User {
            id,
            full_name: format!("User {id}"),
            email: format!("u{id}@site.test"),
            role: Role::Worker,
            department: "Civil".to_string(),
            reports_to,
            created_at_utc: 0,
        }
    }

    #[test]
    fn test_reflexive() {
        let users = vec![user(1, None), user(2, Some(1))];
        assert!(can_assign(1, 1, &users));
        assert!(can_assign(2, 2, &users));
        // Reflexivity holds even for an ID not present in the roster.
        assert!(can_assign(99, 99, &users));
    }

    #[test]
    fn test_direct_and_transitive_reports() {
        // 1 <- 2 <- 3, plus a sibling 4 under 1.
        let users = vec![user(1, None), user(2, Some(1)), user(3, Some(2)), user(4, Some(1))];
        assert!(can_assign(1, 2, &users));
        assert!(can_assign(1, 3, &users));
        assert!(can_assign(2, 3, &users));
        assert!(can_assign(1, 4, &users));
    }

    #[test]
    fn test_not_reachable_upward_or_sideways() {
        let users = vec![user(1, None), user(2, Some(1)), user(3, Some(2)), user(4, Some(1))];
        // Subordinates cannot assign to their managers.
        assert!(!can_assign(3, 1, &users));
        assert!(!can_assign(2, 1, &users));
        // Siblings are not in each other's subtree.
        assert!(!can_assign(4, 2, &users));
    }

    #[test]
    fn test_unknown_target_is_false() {
        let users = vec![user(1, None), user(2, Some(1))];
        assert!(!can_assign(1, 99, &users));
    }

    #[test]
    fn test_cycle_terminates() {
        // 1 -> 2 -> 1 cycle, with 3 hanging off 2.
        let users = vec![user(1, Some(2)), user(2, Some(1)), user(3, Some(2))];
        assert!(can_assign(2, 3, &users));
        assert!(can_assign(1, 3, &users));
        assert!(!can_assign(3, 1, &users));
    }

    #[test]
    fn test_self_loop_terminates() {
        let users = vec![user(1, Some(1)), user(2, Some(1))];
        assert!(can_assign(1, 2, &users));
        assert!(!can_assign(2, 1, &users));
    }

    #[test]
    fn test_team_members() {
        let users = vec![user(1, None), user(2, Some(1)), user(3, Some(2)), user(4, Some(1))];
        let team: Vec<u64> = team_members(1, &users).iter().map(|u| u.id).collect();
        // The manager and direct reports only; 3 is a second-level report.
        assert_eq!(team, vec![1, 2, 4]);
    }

    #[test]
    fn test_org_roots() {
        let users = vec![user(1, None), user(2, Some(1)), user(3, Some(99)), user(4, Some(4))];
        let roots: Vec<u64> = org_roots(&users).iter().map(|u| u.id).collect();
        // No manager, dangling manager, and self-loop all count as roots.
        assert_eq!(roots, vec![1, 3, 4]);
    }
}
