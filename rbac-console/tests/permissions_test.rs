mod common;

use common::{grant, Harness, ADMIN_PASSWORD, MANAGER_PASSWORD};
use rbac_console::models::{Action, MODULES};
use rbac_console::services::permissions::PERMISSIONS_UNAVAILABLE_MESSAGE;
use rbac_console::services::Identity;
use rbac_console::utils::password::Password;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn identity(user_id: &str, role: &str) -> Identity {
    Identity {
        user_id: user_id.to_string(),
        role: role.to_string(),
    }
}

#[tokio::test]
async fn manager_may_view_and_edit_projects_only() {
    let h = Harness::new();
    h.permissions.load(&identity("2", "Manager")).await.unwrap();

    assert!(h.permissions.check("projects", Action::View));
    assert!(h.permissions.check("projects", Action::Edit));
    assert!(!h.permissions.check("projects", Action::Delete));
    assert!(!h.permissions.check("employees", Action::View));
    assert!(!h.permissions.check("reports", Action::View));
}

#[tokio::test]
async fn every_granted_action_is_allowed_and_nothing_else() {
    let h = Harness::new();
    h.permissions.load(&identity("1", "Admin")).await.unwrap();

    for module in MODULES {
        let expected = if module == "roles" {
            vec![Action::View, Action::Edit]
        } else {
            Action::ALL.to_vec()
        };
        for action in Action::ALL {
            assert_eq!(
                h.permissions.check(module, action),
                expected.contains(&action),
                "{} {}",
                module,
                action
            );
        }
    }
}

#[tokio::test]
async fn unknown_action_names_are_denied() {
    let h = Harness::new();
    h.permissions.load(&identity("1", "Admin")).await.unwrap();

    assert!(h.permissions.check_named("users", "view"));
    assert!(!h.permissions.check_named("users", "export"));
}

#[tokio::test]
async fn nothing_is_allowed_before_a_load() {
    let h = Harness::new();
    for module in MODULES {
        for action in Action::ALL {
            assert!(!h.permissions.check(module, action));
        }
    }
}

#[tokio::test]
async fn role_without_a_record_gets_no_permissions() {
    let h = Harness::new();
    h.permissions.load(&identity("9", "Auditor")).await.unwrap();

    assert!(!h.permissions.is_loading());
    assert!(h.permissions.snapshot().is_empty());
    assert!(!h.permissions.check("projects", Action::View));
}

#[tokio::test]
async fn checks_are_denied_while_a_reload_is_in_flight() {
    let h = Harness::new();
    let manager = identity("2", "Manager");
    h.permissions.load(&manager).await.unwrap();
    assert!(h.permissions.check("projects", Action::View));

    h.directory.delay_grants(2, Duration::from_millis(200));
    let registry = h.permissions.clone();
    let reload = tokio::spawn(async move { registry.refresh().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.permissions.is_loading());
    assert!(!h.permissions.check("projects", Action::View));
    assert!(h.permissions.snapshot().is_empty());

    reload.await.unwrap().unwrap();
    assert!(h.permissions.check("projects", Action::View));
}

#[tokio::test]
async fn stale_load_never_overwrites_a_newer_identity() {
    let h = Harness::new();
    h.directory.delay_grants(1, Duration::from_millis(200));

    let registry = h.permissions.clone();
    let slow_admin = tokio::spawn(async move { registry.load(&identity("1", "Admin")).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.permissions.load(&identity("2", "Manager")).await.unwrap();

    slow_admin.await.unwrap().unwrap();

    assert_eq!(h.permissions.identity(), Some(identity("2", "Manager")));
    assert!(!h.permissions.is_loading());
    assert!(h.permissions.check("projects", Action::Edit));
    assert!(!h.permissions.check("users", Action::View));
}

#[tokio::test]
async fn stale_load_is_discarded_after_reset() {
    let h = Harness::new();
    h.directory.delay_grants(1, Duration::from_millis(200));

    let registry = h.permissions.clone();
    let slow_admin = tokio::spawn(async move { registry.load(&identity("1", "Admin")).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.permissions.reset();
    slow_admin.await.unwrap().unwrap();

    assert_eq!(h.permissions.identity(), None);
    assert!(!h.permissions.check("users", Action::View));
}

#[tokio::test]
async fn loading_twice_yields_the_same_snapshot() {
    let h = Harness::new();
    let admin = identity("1", "Admin");

    h.permissions.load(&admin).await.unwrap();
    let first = h.permissions.snapshot();
    h.permissions.load(&admin).await.unwrap();
    let second = h.permissions.snapshot();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn failed_reload_keeps_the_previous_snapshot() {
    let h = Harness::new();
    let manager = identity("2", "Manager");
    h.permissions.load(&manager).await.unwrap();

    h.directory.set_fail_grants(true);
    assert!(h.permissions.refresh().await.is_err());

    assert!(!h.permissions.is_loading());
    assert!(h.permissions.check("projects", Action::Edit));
}

#[tokio::test]
async fn load_failure_is_reported_until_a_load_succeeds() {
    let h = Harness::new();
    let manager = identity("2", "Manager");

    h.directory.set_fail_grants(true);
    assert!(h.permissions.load(&manager).await.is_err());
    assert_eq!(
        h.permissions.load_error().as_deref(),
        Some(PERMISSIONS_UNAVAILABLE_MESSAGE)
    );

    h.directory.set_fail_grants(false);
    h.permissions.refresh().await.unwrap();
    assert_eq!(h.permissions.load_error(), None);
    assert!(h.permissions.check("projects", Action::View));

    h.directory.set_fail_grants(true);
    assert!(h.permissions.refresh().await.is_err());
    h.permissions.reset();
    assert_eq!(h.permissions.load_error(), None);
}

#[tokio::test]
async fn failed_load_for_a_new_identity_denies_everything() {
    let h = Harness::new();
    h.permissions.load(&identity("1", "Admin")).await.unwrap();

    h.directory.set_fail_grants(true);
    assert!(h.permissions.load(&identity("2", "Manager")).await.is_err());

    assert!(!h.permissions.check("users", Action::View));
    assert!(!h.permissions.check("projects", Action::View));
}

#[tokio::test]
async fn sync_skips_reload_for_the_same_identity() {
    let h = Harness::new();
    let manager = identity("2", "Manager");

    h.permissions.sync(Some(manager.clone())).await.unwrap();
    h.permissions.sync(Some(manager)).await.unwrap();

    assert_eq!(h.directory.grant_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sync_to_anonymous_resets_to_denial() {
    let h = Harness::new();
    h.permissions.load(&identity("1", "Admin")).await.unwrap();

    h.permissions.sync(None).await.unwrap();

    assert!(!h.permissions.is_loading());
    assert_eq!(h.permissions.identity(), None);
    assert!(h.permissions.snapshot().is_empty());
    assert!(!h.permissions.check("users", Action::View));
}

#[tokio::test]
async fn edited_grants_apply_after_refresh() {
    let h = Harness::new();
    h.permissions.load(&identity("2", "Manager")).await.unwrap();
    assert!(!h.permissions.check("employees", Action::View));

    h.directory
        .grants
        .lock()
        .unwrap()
        .push(grant(6, 2, "employees", &[Action::View]));
    h.permissions.refresh().await.unwrap();

    assert!(h.permissions.check("employees", Action::View));
}

async fn settle<F: Fn() -> bool>(condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn follow_tracks_login_and_logout() {
    let h = Harness::new();
    let watcher = h.permissions.follow(&h.session);

    h.session
        .login("manager@example.com", &Password::new(MANAGER_PASSWORD))
        .await
        .unwrap();
    settle(|| h.permissions.check("projects", Action::Edit)).await;

    h.session.logout().await;
    settle(|| h.permissions.identity().is_none()).await;
    assert!(!h.permissions.check("projects", Action::View));

    h.session
        .login("admin@example.com", &Password::new(ADMIN_PASSWORD))
        .await
        .unwrap();
    settle(|| h.permissions.check("users", Action::Delete)).await;

    watcher.abort();
}
