//! Integration tests for write paths and cache invalidation
//!
//! Preference add and delete clear the written owner's cached resolutions.
//! Replace clears them only when the published state flips. Custom text
//! writes clear exactly one (screen, locale) entry. Invalidation never
//! cascades to descendants.

use std::sync::Arc;

use livery_test_utils::assertions::{assert_code, assert_not_found};
use livery_test_utils::fixtures::{primary_color, published_payload, text_payload, unpublished_payload};
use livery_test_utils::{
    CustomText, ErrorCode, ExecutionContext, Harness, OwnerKind, Preference, RecordingListener,
    ScriptedDirectory, TenantContext, VetoListener,
};

const LOCALE: &str = "en_US";

fn org_preference(tenant: &TenantContext, payload: serde_json::Value) -> Preference {
    Preference::new(OwnerKind::Organization, &tenant.tenant_domain, LOCALE, payload)
}

fn resolve_color(h: &Harness, tenant: &TenantContext) -> String {
    let mut exec = ExecutionContext::new(tenant.clone());
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, &tenant.tenant_domain, LOCALE)
        .unwrap();
    primary_color(&found.payload).unwrap_or_default().to_string()
}

// ============================================================================
// PREFERENCES
// ============================================================================

#[test]
fn test_add_clears_cached_fallback() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();

    assert_eq!(resolve_color(&h, child), "#000000");

    h.manager.add_preference(child, org_preference(child, published_payload("#111111"))).unwrap();
    assert_eq!(resolve_color(&h, child), "#111111");
}

#[test]
fn test_replace_keeping_published_state_keeps_cache() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let child = &tenants[1];
    let h = Harness::new(directory);
    h.manager.add_preference(child, org_preference(child, published_payload("#111111"))).unwrap();
    assert_eq!(resolve_color(&h, child), "#111111");
    let entries = h.cache_backend.len();

    h.manager
        .replace_preference(child, org_preference(child, published_payload("#222222")))
        .unwrap();
    assert_eq!(h.cache_backend.len(), entries);

    // The cached location is still the child, which now holds the new payload.
    h.directory.reset_calls();
    assert_eq!(resolve_color(&h, child), "#222222");
    assert_eq!(h.directory.call_count(), 0);
}

#[test]
fn test_unpublishing_clears_cache_and_falls_back() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();
    h.manager.add_preference(child, org_preference(child, published_payload("#111111"))).unwrap();
    assert_eq!(resolve_color(&h, child), "#111111");

    h.manager
        .replace_preference(child, org_preference(child, unpublished_payload("#111111")))
        .unwrap();
    assert_eq!(resolve_color(&h, child), "#000000");
}

#[test]
fn test_publishing_clears_cached_fallback() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();
    h.manager.add_preference(child, org_preference(child, unpublished_payload("#111111"))).unwrap();
    assert_eq!(resolve_color(&h, child), "#000000");

    h.manager
        .replace_preference(child, org_preference(child, published_payload("#111111")))
        .unwrap();
    assert_eq!(resolve_color(&h, child), "#111111");
}

#[test]
fn test_delete_clears_cache_and_falls_back() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();
    h.manager.add_preference(child, org_preference(child, published_payload("#111111"))).unwrap();
    assert_eq!(resolve_color(&h, child), "#111111");

    h.manager
        .delete_preference(child, OwnerKind::Organization, "org-1.com", LOCALE)
        .unwrap();
    assert_eq!(resolve_color(&h, child), "#000000");
}

#[test]
fn test_add_during_walk_is_not_masked_by_cached_fallback() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();

    // The child's preference lands right after the walk missed it, followed
    // by the invalidation the write path performs.
    let resources = Arc::clone(&h.resources);
    let cache = h.manager.resolver().cache().clone();
    let child_domain = child.tenant_domain.clone();
    h.resources.on_next_miss(move || {
        resources.put_raw(
            &child_domain,
            "BRANDING_PREFERENCES",
            &format!("{}_{}", child_domain, LOCALE),
            published_payload("#111111").to_string().as_bytes(),
        );
        cache
            .invalidate_preference(&child_domain, OwnerKind::Organization, &child_domain)
            .unwrap();
    });

    assert_eq!(resolve_color(&h, child), "#000000");
    assert_eq!(resolve_color(&h, child), "#111111");
}

#[test]
fn test_invalidation_does_not_cascade_to_descendants() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();
    assert_eq!(resolve_color(&h, child), "#000000");

    h.manager
        .replace_preference(root, org_preference(root, unpublished_payload("#000000")))
        .unwrap();

    // The child's entry still points at the root and is trusted.
    assert_eq!(resolve_color(&h, child), "#000000");

    h.manager
        .clear_cached_resolutions(child, OwnerKind::Organization, "org-1.com")
        .unwrap();
    let mut exec = ExecutionContext::new(child.clone());
    let result = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-1.com", LOCALE);
    assert_not_found(&result);
}

#[test]
fn test_duplicate_add_and_missing_replace() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let root = &tenants[0];
    let h = Harness::new(directory);

    let missing = h
        .manager
        .replace_preference(root, org_preference(root, published_payload("#000000")));
    assert_code(&missing, ErrorCode::PreferenceNotFound);

    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();
    let duplicate = h
        .manager
        .add_preference(root, org_preference(root, published_payload("#ffffff")));
    assert_code(&duplicate, ErrorCode::PreferenceAlreadyExists);
    assert!(duplicate.unwrap_err().is_client_error());

    let stored = h
        .manager
        .get_preference(root, OwnerKind::Organization, "org-0.com", LOCALE)
        .unwrap();
    assert_eq!(primary_color(&stored.payload), Some("#000000"));
}

#[test]
fn test_writes_reject_foreign_organization_owner() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let h = Harness::new(directory);

    let foreign = Preference::new(OwnerKind::Organization, "org-0.com", LOCALE, published_payload("#000000"));
    let result = h.manager.add_preference(&tenants[1], foreign);
    assert_code(&result, ErrorCode::InvalidOwner);
    assert!(h.resources.is_empty());
}

#[test]
fn test_application_preferences_are_stored_per_tenant() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let h = Harness::new(directory);

    let preference = Preference::new(OwnerKind::Application, "App-1", LOCALE, published_payload("#a1a1a1"));
    h.manager.add_preference(&tenants[1], preference).unwrap();

    assert!(h.resources.contains("org-1.com", "APPLICATION_BRANDING_PREFERENCES", "app-1_en_US"));
    let other_tenant = h
        .manager
        .get_preference(&tenants[0], OwnerKind::Application, "App-1", LOCALE);
    assert_not_found(&other_tenant);
}

// ============================================================================
// LISTENERS
// ============================================================================

#[test]
fn test_listeners_see_every_write() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let root = &tenants[0];
    let listener = Arc::new(RecordingListener::new());
    let h = Harness::builder(directory).listener(listener.clone()).build();

    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();
    h.manager
        .replace_preference(root, org_preference(root, published_payload("#010101")))
        .unwrap();
    h.manager
        .delete_preference(root, OwnerKind::Organization, "org-0.com", LOCALE)
        .unwrap();

    let names: Vec<String> = listener.events().into_iter().map(|(_, name)| name).collect();
    assert_eq!(names, vec!["pre_add", "pre_update", "pre_delete"]);
    assert!(listener.events().iter().all(|(tenant, _)| tenant == "org-0.com"));
}

#[test]
fn test_vetoed_delete_is_a_client_error_and_keeps_data() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let root = &tenants[0];
    let h = Harness::builder(directory)
        .listener(Arc::new(VetoListener::vetoing(&["pre_delete"])))
        .build();

    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();
    let result = h
        .manager
        .delete_preference(root, OwnerKind::Organization, "org-0.com", LOCALE);

    assert_code(&result, ErrorCode::OperationNotAllowed);
    assert!(result.unwrap_err().is_client_error());
    assert!(h
        .manager
        .get_preference(root, OwnerKind::Organization, "org-0.com", LOCALE)
        .is_ok());
}

#[test]
fn test_vetoed_add_stores_nothing() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let root = &tenants[0];
    let h = Harness::builder(directory)
        .listener(Arc::new(VetoListener::vetoing(&["pre_add"])))
        .build();

    let result = h
        .manager
        .add_preference(root, org_preference(root, published_payload("#000000")));
    assert_code(&result, ErrorCode::OperationNotAllowed);
    assert!(h.resources.is_empty());
}

// ============================================================================
// CUSTOM TEXT
// ============================================================================

#[test]
fn test_custom_text_write_clears_exactly_one_entry() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    for screen in ["login", "signup"] {
        h.manager
            .add_custom_text(
                root,
                CustomText::new(OwnerKind::Organization, "org-0.com", screen, LOCALE, text_payload("Root")),
            )
            .unwrap();
    }

    let mut exec = ExecutionContext::new(child.clone());
    for screen in ["login", "signup"] {
        h.manager
            .resolve_custom_text(&mut exec, OwnerKind::Organization, "org-1.com", screen, LOCALE)
            .unwrap();
    }
    assert_eq!(h.cache_backend.len(), 2);

    h.manager
        .add_custom_text(
            child,
            CustomText::new(OwnerKind::Organization, "org-1.com", "login", "en-US", text_payload("Child")),
        )
        .unwrap();
    assert_eq!(h.cache_backend.len(), 1);

    let login = h
        .manager
        .resolve_custom_text(&mut exec, OwnerKind::Organization, "org-1.com", "login", LOCALE)
        .unwrap();
    assert_eq!(login.owner_id, "org-1.com");
    assert_eq!(login.payload["login.heading"], "Child");

    let signup = h
        .manager
        .resolve_custom_text(&mut exec, OwnerKind::Organization, "org-1.com", "signup", LOCALE)
        .unwrap();
    assert_eq!(signup.owner_id, "org-0.com");
}

#[test]
fn test_custom_text_replace_and_delete() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let root = &tenants[0];
    let h = Harness::new(directory);
    let text = |heading: &str| {
        CustomText::new(OwnerKind::Application, "app-1", "login", LOCALE, text_payload(heading))
    };

    h.manager.add_custom_text(root, text("One")).unwrap();
    assert_code(&h.manager.add_custom_text(root, text("Again")), ErrorCode::CustomTextAlreadyExists);

    h.manager.replace_custom_text(root, text("Two")).unwrap();
    let stored = h
        .manager
        .get_custom_text(root, OwnerKind::Application, "app-1", "login", LOCALE)
        .unwrap();
    assert_eq!(stored.payload["login.heading"], "Two");
    assert!(h.resources.contains("org-0.com", "APPLICATION_CUSTOM_TEXT", "app-1_LOGIN_en-us"));

    h.manager
        .delete_custom_text(root, OwnerKind::Application, "app-1", "login", LOCALE)
        .unwrap();
    assert_code(
        &h.manager
            .delete_custom_text(root, OwnerKind::Application, "app-1", "login", LOCALE),
        ErrorCode::CustomTextNotFound,
    );
    assert_code(&h.manager.replace_custom_text(root, text("Three")), ErrorCode::CustomTextNotFound);
}

// ============================================================================
// TENANT TEARDOWN
// ============================================================================

#[test]
fn test_delete_all_for_tenant() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    h.manager.add_preference(root, org_preference(root, published_payload("#000000"))).unwrap();
    h.manager.add_preference(child, org_preference(child, published_payload("#111111"))).unwrap();
    h.manager
        .add_preference(
            child,
            Preference::new(
                OwnerKind::Application,
                "app-1",
                LOCALE,
                livery_test_utils::fixtures::custom_layout_payload("<div>{{MainSection}}</div>", None, None),
            ),
        )
        .unwrap();
    h.manager
        .add_custom_text(
            child,
            CustomText::new(OwnerKind::Organization, "org-1.com", "login", LOCALE, text_payload("Child")),
        )
        .unwrap();
    assert_eq!(resolve_color(&h, child), "#111111");

    h.manager.delete_all_for_tenant(child).unwrap();

    assert!(!h.resources.contains("org-1.com", "BRANDING_PREFERENCES", "org-1.com_en_US"));
    assert!(!h.resources.contains("org-1.com", "CUSTOM_TEXT", "LOGIN_en-us"));
    assert!(h.resources.contains("org-0.com", "BRANDING_PREFERENCES", "org-0.com_en_US"));
    let layout = h
        .content()
        .get(&livery_test_utils::ContentOwner::application("app-1", "org-1"))
        .unwrap();
    assert!(layout.is_none());

    assert_eq!(resolve_color(&h, child), "#000000");
}
