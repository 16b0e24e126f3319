//! Reachability rules between tenants.
//!
//! [`can_access`] is the rank rule applied on every request: a tenant reaches
//! itself and any tenant of a lower type. It does not look at the tree, so a
//! provider passes it for another provider's customers.
//! [`can_access_with_lineage`] adds the structural check for callers that
//! need it.

use std::collections::{HashSet, VecDeque};
use tracing::{debug, instrument};

use super::{TenantDirectory, TenantId, TenantResult, TenantType};

/// Rank-only reachability check.
pub fn can_access(
    requester_id: &TenantId,
    requester_type: TenantType,
    target_id: &TenantId,
    target_type: TenantType,
) -> bool {
    if requester_id == target_id {
        return true;
    }
    match requester_type {
        TenantType::Root => true,
        TenantType::Provider => {
            matches!(target_type, TenantType::Customer | TenantType::SubCustomer)
        }
        TenantType::Customer => target_type == TenantType::SubCustomer,
        TenantType::SubCustomer => false,
    }
}

/// Rank check plus a walk up the target's parent chain.
///
/// Allows only when the rank rule passes and the target is the requester, a
/// root requester, or a structural descendant of the requester.
#[instrument(skip(directory))]
pub async fn can_access_with_lineage(
    directory: &dyn TenantDirectory,
    requester_id: &TenantId,
    requester_type: TenantType,
    target_id: &TenantId,
    target_type: TenantType,
) -> TenantResult<bool> {
    if !can_access(requester_id, requester_type, target_id, target_type) {
        return Ok(false);
    }
    if requester_id == target_id || requester_type == TenantType::Root {
        return Ok(true);
    }

    let mut visited = HashSet::new();
    let mut current = target_id.clone();
    while visited.insert(current.clone()) {
        let Some(tenant) = directory.get(&current).await? else {
            debug!(tenant_id = %current, "Lineage walk hit unknown tenant");
            return Ok(false);
        };
        match tenant.parent_id {
            Some(parent) if &parent == requester_id => return Ok(true),
            Some(parent) => current = parent,
            None => return Ok(false),
        }
    }
    // Cycle in the stored tree.
    Ok(false)
}

/// Lists every tenant ID reachable from `tenant_id`, itself included.
///
/// Root sees every tenant the directory knows. Other tenants see their own
/// subtree, descending only into children of strictly lower rank.
#[instrument(skip(directory))]
pub async fn accessible_tenant_ids(
    directory: &dyn TenantDirectory,
    tenant_id: &TenantId,
    tenant_type: TenantType,
) -> TenantResult<Vec<TenantId>> {
    match tenant_type {
        TenantType::Root => {
            let mut ids = directory.all_tenant_ids().await?;
            if !ids.contains(tenant_id) {
                ids.insert(0, tenant_id.clone());
            }
            Ok(ids)
        }
        TenantType::SubCustomer => Ok(vec![tenant_id.clone()]),
        TenantType::Provider | TenantType::Customer => {
            let mut result = vec![tenant_id.clone()];
            let mut visited: HashSet<TenantId> = HashSet::from([tenant_id.clone()]);
            let mut queue = VecDeque::from([(tenant_id.clone(), tenant_type)]);

            while let Some((parent_id, parent_type)) = queue.pop_front() {
                for child in directory.children(&parent_id).await? {
                    if child.tenant_type.rank() >= parent_type.rank() {
                        continue;
                    }
                    if visited.insert(child.id.clone()) {
                        result.push(child.id.clone());
                        queue.push_back((child.id, child.tenant_type));
                    }
                }
            }
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::{InMemoryTenantDirectory, Tenant};

    fn id(s: &str) -> TenantId {
        TenantId::from(s)
    }

    async fn sample_tree() -> InMemoryTenantDirectory {
        let dir = InMemoryTenantDirectory::new();
        let root = Tenant::root("r", "Platform");
        let p1 = Tenant::new("p1", "MSP One", TenantType::Provider, Some(&root)).unwrap();
        let p2 = Tenant::new("p2", "MSP Two", TenantType::Provider, Some(&root)).unwrap();
        let c1 = Tenant::new("c1", "Customer One", TenantType::Customer, Some(&p1)).unwrap();
        let c2 = Tenant::new("c2", "Customer Two", TenantType::Customer, Some(&p2)).unwrap();
        let s1 = Tenant::new("s1", "Branch", TenantType::SubCustomer, Some(&c1)).unwrap();
        for t in [root, p1, p2, c1, c2, s1] {
            dir.insert(t).await.unwrap();
        }
        dir
    }

    #[test]
    fn test_self_access_always_allowed() {
        for t in TenantType::all() {
            assert!(can_access(&id("x"), t, &id("x"), t));
        }
    }

    #[test]
    fn test_rank_rule_ignores_lineage() {
        // p1 does not own c2, but the rank rule allows it.
        assert!(can_access(
            &id("p1"),
            TenantType::Provider,
            &id("c2"),
            TenantType::Customer
        ));
    }

    /// Tenant type of a sample tree id, from its first letter.
    fn kind(tenant: &str) -> TenantType {
        match &tenant[..1] {
            "r" => TenantType::Root,
            "p" => TenantType::Provider,
            "c" => TenantType::Customer,
            _ => TenantType::SubCustomer,
        }
    }

    async fn lineage(dir: &InMemoryTenantDirectory, from: &str, to: &str) -> bool {
        can_access_with_lineage(dir, &id(from), kind(from), &id(to), kind(to))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_lineage_check() {
        let dir = sample_tree().await;

        assert!(lineage(&dir, "p1", "s1").await);
        assert!(!lineage(&dir, "p1", "c2").await);
        assert!(lineage(&dir, "r", "c2").await);
        assert!(!lineage(&dir, "c1", "p1").await);
    }

    #[tokio::test]
    async fn test_accessible_ids() {
        let dir = sample_tree().await;

        let root = accessible_tenant_ids(&dir, &id("r"), TenantType::Root)
            .await
            .unwrap();
        assert_eq!(root.len(), 6);

        let p1 = accessible_tenant_ids(&dir, &id("p1"), TenantType::Provider)
            .await
            .unwrap();
        assert_eq!(p1, vec![id("p1"), id("c1"), id("s1")]);

        let c2 = accessible_tenant_ids(&dir, &id("c2"), TenantType::Customer)
            .await
            .unwrap();
        assert_eq!(c2, vec![id("c2")]);

        let s1 = accessible_tenant_ids(&dir, &id("s1"), TenantType::SubCustomer)
            .await
            .unwrap();
        assert_eq!(s1, vec![id("s1")]);
    }

    #[tokio::test]
    async fn test_traversal_survives_cycles() {
        // Built without insert() so the bad edges get through.
        let a = Tenant {
            id: id("a"),
            name: "A".into(),
            tenant_type: TenantType::Customer,
            parent_id: Some(id("b")),
        };
        let b = Tenant {
            id: id("b"),
            name: "B".into(),
            tenant_type: TenantType::SubCustomer,
            parent_id: Some(id("a")),
        };
        let dir = InMemoryTenantDirectory::with_tenants(vec![a, b]);

        let ids = accessible_tenant_ids(&dir, &id("a"), TenantType::Customer)
            .await
            .unwrap();
        assert_eq!(ids, vec![id("a"), id("b")]);

        let reachable = can_access_with_lineage(
            &dir,
            &id("x"),
            TenantType::Customer,
            &id("b"),
            TenantType::SubCustomer,
        )
        .await
        .unwrap();
        assert!(!reachable);
    }
}
