//! Integration tests for hierarchical resolution
//!
//! Covers fallback order within a level, ascension through organization
//! ancestry, the resolution cache shortcut, and restoration of the execution
//! context on every exit path.

use std::sync::Arc;

use livery_test_utils::assertions::{assert_code, assert_not_found};
use livery_test_utils::fixtures::{primary_color, published_payload, text_payload, unpublished_payload};
use livery_test_utils::{
    ErrorCode, ExecutionContext, Harness, LiveryConfig, OwnerKind, ScriptedDirectory,
    StaticSharedApplications,
};

const LOCALE: &str = "en_US";

fn uncached() -> LiveryConfig {
    LiveryConfig {
        cache_enabled: false,
        ..LiveryConfig::default()
    }
}

// ============================================================================
// FALLBACK ORDER
// ============================================================================

#[test]
fn test_application_then_organization_then_parent() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::builder(directory).config(uncached()).build();

    h.seed_preference(child, OwnerKind::Application, "app-1", LOCALE, &published_payload("#a00001"));
    h.seed_preference(child, OwnerKind::Organization, "org-1.com", LOCALE, &published_payload("#c00001"));
    h.seed_preference(root, OwnerKind::Organization, "org-0.com", LOCALE, &published_payload("#r00001"));

    let mut exec = ExecutionContext::new(child.clone());

    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Application, "app-1", LOCALE)
        .unwrap();
    assert_eq!(found.kind, OwnerKind::Application);
    assert_eq!(found.owner_id, "app-1");
    assert_eq!(primary_color(&found.payload), Some("#a00001"));

    h.manager
        .delete_preference(child, OwnerKind::Application, "app-1", LOCALE)
        .unwrap();
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Application, "app-1", LOCALE)
        .unwrap();
    assert_eq!(found.kind, OwnerKind::Organization);
    assert_eq!(found.owner_id, "org-1.com");
    assert_eq!(primary_color(&found.payload), Some("#c00001"));

    h.manager
        .delete_preference(child, OwnerKind::Organization, "org-1.com", LOCALE)
        .unwrap();
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Application, "app-1", LOCALE)
        .unwrap();
    assert_eq!(found.kind, OwnerKind::Organization);
    assert_eq!(found.owner_id, "org-0.com");
    assert_eq!(primary_color(&found.payload), Some("#r00001"));
    assert_eq!(exec.current(), child);
}

#[test]
fn test_ascends_three_levels_to_root() {
    let (directory, tenants) = ScriptedDirectory::chain(3);
    let h = Harness::new(directory);
    h.seed_preference(&tenants[0], OwnerKind::Organization, "org-0.com", LOCALE, &published_payload("#000000"));

    let mut exec = ExecutionContext::new(tenants[3].clone());
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-3.com", LOCALE)
        .unwrap();

    assert_eq!(found.kind, OwnerKind::Organization);
    assert_eq!(found.owner_id, "org-0.com");
    assert_eq!(found.locale, LOCALE);
    assert_eq!(exec.depth(), 0);
    assert_eq!(exec.current(), &tenants[3]);
}

#[test]
fn test_unpublished_levels_are_skipped() {
    let (directory, tenants) = ScriptedDirectory::chain(2);
    let h = Harness::new(directory);
    h.seed_preference(&tenants[2], OwnerKind::Organization, "org-2.com", LOCALE, &unpublished_payload("#222222"));
    h.seed_preference(&tenants[1], OwnerKind::Organization, "org-1.com", LOCALE, &published_payload("#111111"));

    let mut exec = ExecutionContext::new(tenants[2].clone());
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-2.com", LOCALE)
        .unwrap();
    assert_eq!(found.owner_id, "org-1.com");
    assert_eq!(primary_color(&found.payload), Some("#111111"));
}

#[test]
fn test_application_without_shared_mapping_falls_back_to_organizations() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let h = Harness::new(directory);
    h.seed_preference(&tenants[0], OwnerKind::Application, "app-1", LOCALE, &published_payload("#a0a0a0"));
    h.seed_preference(&tenants[0], OwnerKind::Organization, "org-0.com", LOCALE, &published_payload("#0f0f0f"));

    let mut exec = ExecutionContext::new(tenants[1].clone());
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Application, "app-1", LOCALE)
        .unwrap();
    assert_eq!(found.kind, OwnerKind::Organization);
    assert_eq!(found.owner_id, "org-0.com");
}

#[test]
fn test_shared_application_resolves_to_parent_application() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let shared = StaticSharedApplications::new();
    shared.share("app-child", "org-1", "org-0", "app-root");
    let h = Harness::builder(directory)
        .shared_applications(Arc::new(shared))
        .build();
    h.seed_preference(&tenants[0], OwnerKind::Application, "app-root", LOCALE, &published_payload("#5a5a5a"));
    h.seed_preference(&tenants[0], OwnerKind::Organization, "org-0.com", LOCALE, &published_payload("#0f0f0f"));

    let mut exec = ExecutionContext::new(tenants[1].clone());
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Application, "app-child", LOCALE)
        .unwrap();
    assert_eq!(found.kind, OwnerKind::Application);
    assert_eq!(found.owner_id, "app-root");
    assert_eq!(primary_color(&found.payload), Some("#5a5a5a"));
}

#[test]
fn test_deep_chain_without_preferences_is_not_found() {
    let (directory, tenants) = ScriptedDirectory::chain(50);
    let h = Harness::new(directory);

    let mut exec = ExecutionContext::new(tenants[50].clone());
    let result = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-50.com", LOCALE);

    assert_code(&result, ErrorCode::PreferenceNotFound);
    assert!(result.unwrap_err().is_client_error());
    assert_eq!(exec.depth(), 0);
    assert_eq!(exec.current(), &tenants[50]);
    // depth, parent and domain per hop, plus the final depth check at the root
    assert!(h.directory.call_count() <= 3 * 50 + 1);
}

#[test]
fn test_not_found_names_requesting_owner() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let h = Harness::new(directory);

    let mut exec = ExecutionContext::new(tenants[0].clone());
    let err = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Application, "app-9", "fr_FR")
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("app-9"), "{}", message);
    assert!(message.contains("fr_FR"), "{}", message);
}

// ============================================================================
// CACHE SHORTCUT
// ============================================================================

#[test]
fn test_cached_resolution_skips_the_walk() {
    let (directory, tenants) = ScriptedDirectory::chain(3);
    let h = Harness::new(directory);
    h.seed_preference(&tenants[0], OwnerKind::Organization, "org-0.com", LOCALE, &published_payload("#000000"));

    let mut exec = ExecutionContext::new(tenants[3].clone());
    h.manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-3.com", LOCALE)
        .unwrap();
    assert!(h.directory.call_count() > 0);

    h.directory.reset_calls();
    let reads_before = h.resources.read_count();
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-3.com", LOCALE)
        .unwrap();

    assert_eq!(found.owner_id, "org-0.com");
    assert_eq!(h.directory.call_count(), 0);
    assert_eq!(h.resources.read_count() - reads_before, 1);
}

#[test]
fn test_cache_keys_are_per_locale() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let h = Harness::new(directory);
    h.seed_preference(&tenants[0], OwnerKind::Organization, "org-0.com", "en_US", &published_payload("#e0e0e0"));
    h.seed_preference(&tenants[0], OwnerKind::Organization, "org-0.com", "fr_FR", &published_payload("#f0f0f0"));

    let mut exec = ExecutionContext::new(tenants[1].clone());
    let en = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-1.com", "en_US")
        .unwrap();
    let fr = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-1.com", "fr_FR")
        .unwrap();
    assert_eq!(primary_color(&en.payload), Some("#e0e0e0"));
    assert_eq!(primary_color(&fr.payload), Some("#f0f0f0"));
}

#[test]
fn test_dangling_cache_entry_reports_not_found_then_walks_again() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let (root, child) = (&tenants[0], &tenants[1]);
    let h = Harness::new(directory);
    h.seed_preference(root, OwnerKind::Organization, "org-0.com", LOCALE, &published_payload("#000000"));

    let mut exec = ExecutionContext::new(child.clone());
    h.manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-1.com", LOCALE)
        .unwrap();

    // Clears the root's own entries only; the child's entry still points here.
    h.manager
        .delete_preference(root, OwnerKind::Organization, "org-0.com", LOCALE)
        .unwrap();
    h.directory.reset_calls();
    let dangling = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-1.com", LOCALE);
    assert_not_found(&dangling);
    assert_eq!(h.directory.call_count(), 0);

    h.seed_preference(root, OwnerKind::Organization, "org-0.com", LOCALE, &published_payload("#010101"));
    let found = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-1.com", LOCALE)
        .unwrap();
    assert_eq!(primary_color(&found.payload), Some("#010101"));
    assert!(h.directory.call_count() > 0);
}

// ============================================================================
// ERRORS AND CONTEXT RESTORATION
// ============================================================================

#[test]
fn test_context_restored_after_directory_failure() {
    let (directory, tenants) = ScriptedDirectory::chain(2);
    directory.fail_lookups_for("org-0");
    let h = Harness::new(directory);

    let mut exec = ExecutionContext::new(tenants[2].clone());
    let result = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-2.com", LOCALE);

    assert_code(&result, ErrorCode::DirectoryFailure);
    assert!(result.unwrap_err().is_server_error());
    assert_eq!(exec.depth(), 0);
    assert_eq!(exec.current(), &tenants[2]);
}

#[test]
fn test_depth_must_decrease_toward_root() {
    let (directory, tenants) = ScriptedDirectory::chain(2);
    directory.set_depth("org-1", 5);
    let h = Harness::new(directory);

    let mut exec = ExecutionContext::new(tenants[2].clone());
    let result = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-2.com", LOCALE);
    assert_code(&result, ErrorCode::DirectoryFailure);
    assert_eq!(exec.depth(), 0);
}

#[test]
fn test_context_restored_after_success_at_ancestor() {
    let (directory, tenants) = ScriptedDirectory::chain(2);
    let h = Harness::new(directory);
    h.seed_preference(&tenants[1], OwnerKind::Organization, "org-1.com", LOCALE, &published_payload("#111111"));

    let mut exec = ExecutionContext::new(tenants[2].clone());
    h.manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-2.com", LOCALE)
        .unwrap();
    assert_eq!(exec.depth(), 0);
    assert_eq!(exec.current(), &tenants[2]);
}

#[test]
fn test_organization_owner_must_be_active_tenant() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let h = Harness::new(directory);

    let mut exec = ExecutionContext::new(tenants[1].clone());
    let result = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-0.com", LOCALE);
    assert_code(&result, ErrorCode::InvalidOwner);
    assert!(result.unwrap_err().is_client_error());
}

#[test]
fn test_corrupt_document_is_a_server_error() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let h = Harness::new(directory);
    h.resources.put_raw("org-0.com", "BRANDING_PREFERENCES", "org-0.com_en_US", b"{not json");

    let mut exec = ExecutionContext::new(tenants[0].clone());
    let result = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-0.com", LOCALE);
    assert_code(&result, ErrorCode::CorruptData);
    assert!(result.unwrap_err().is_server_error());
}

#[test]
fn test_unavailable_resource_store_is_a_server_error() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let h = Harness::new(directory);
    h.resources.set_unavailable(true);

    let mut exec = ExecutionContext::new(tenants[0].clone());
    let result = h
        .manager
        .resolve_preference(&mut exec, OwnerKind::Organization, "org-0.com", LOCALE);
    assert_code(&result, ErrorCode::ResourceStoreFailure);
}

// ============================================================================
// CUSTOM TEXT
// ============================================================================

#[test]
fn test_custom_text_falls_back_to_ancestor() {
    let (directory, tenants) = ScriptedDirectory::chain(2);
    let h = Harness::new(directory);
    h.seed_text(&tenants[0], OwnerKind::Organization, "org-0.com", "login", "en_US", &text_payload("Welcome"));

    let mut exec = ExecutionContext::new(tenants[2].clone());
    let text = h
        .manager
        .resolve_custom_text(&mut exec, OwnerKind::Application, "app-1", "login", "en_US")
        .unwrap();
    assert_eq!(text.owner_id, "org-0.com");
    assert_eq!(text.screen, "login");
    assert_eq!(text.payload["login.heading"], "Welcome");
    assert_eq!(exec.depth(), 0);
}

#[test]
fn test_custom_text_locale_forms_share_a_resource() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let h = Harness::new(directory);
    h.seed_text(&tenants[0], OwnerKind::Organization, "org-0.com", "login", "en_US", &text_payload("Hello"));

    let mut exec = ExecutionContext::new(tenants[0].clone());
    let text = h
        .manager
        .resolve_custom_text(&mut exec, OwnerKind::Organization, "org-0.com", "LOGIN", "en-us")
        .unwrap();
    assert_eq!(text.payload["login.heading"], "Hello");
}

#[test]
fn test_unpublished_flag_does_not_hide_custom_text() {
    let (directory, tenants) = ScriptedDirectory::chain(0);
    let h = Harness::new(directory);
    let payload = serde_json::json!({
        "configs": { "isBrandingEnabled": false },
        "login.heading": "Still shown"
    });
    h.seed_text(&tenants[0], OwnerKind::Organization, "org-0.com", "login", "en_US", &payload);

    let mut exec = ExecutionContext::new(tenants[0].clone());
    let text = h
        .manager
        .resolve_custom_text(&mut exec, OwnerKind::Organization, "org-0.com", "login", "en_US")
        .unwrap();
    assert_eq!(text.payload["login.heading"], "Still shown");
}

#[test]
fn test_missing_custom_text_is_not_found() {
    let (directory, tenants) = ScriptedDirectory::chain(1);
    let h = Harness::new(directory);

    let mut exec = ExecutionContext::new(tenants[1].clone());
    let result = h
        .manager
        .resolve_custom_text(&mut exec, OwnerKind::Organization, "org-1.com", "login", "en_US");
    assert_code(&result, ErrorCode::CustomTextNotFound);
}
