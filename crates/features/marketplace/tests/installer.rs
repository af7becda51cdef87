mod common;

use axum::http::StatusCode;
use common::{ZipBuilder, plugin_archive, write_manifest};
use mkt_marketplace::{InstalledPlugin, Installer, MarketplaceError};
use std::path::PathBuf;

const UNPACK_LIMIT: u64 = 1024 * 1024;

fn installer() -> Installer {
    Installer::new(PathBuf::from("/var/lib/grafana/plugins"), UNPACK_LIMIT)
}

#[test]
fn missing_plugin_dir_lists_nothing() {
    let root = tempfile::tempdir().unwrap();
    let plugins = Installer::list(&root.path().join("absent")).expect("listing");
    assert!(plugins.is_empty());
}

#[test]
fn lists_manifests_at_root_and_in_dist_sorted_by_id() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path();
    write_manifest(
        dir,
        "zabbix-app",
        "",
        r#"{"id":"alexanderzobnin-zabbix-app","type":"app","name":"Zabbix","info":{"version":"4.4.0"}}"#,
    );
    write_manifest(
        dir,
        "grafana-clock-panel",
        "dist",
        r#"{"id":"grafana-clock-panel","type":"panel","name":"Clock","info":{"version":"2.1.3"}}"#,
    );
    write_manifest(dir, "broken", "", "{ not json");
    std::fs::create_dir_all(dir.join("empty")).unwrap();
    std::fs::write(dir.join("README.md"), "not a plugin").unwrap();

    let plugins = Installer::list(dir).expect("listing");
    assert_eq!(
        plugins,
        vec![
            InstalledPlugin {
                id: "alexanderzobnin-zabbix-app".to_owned(),
                kind: "app".to_owned(),
                name: "Zabbix".to_owned(),
                version: "4.4.0".to_owned(),
            },
            InstalledPlugin {
                id: "grafana-clock-panel".to_owned(),
                kind: "panel".to_owned(),
                name: "Clock".to_owned(),
                version: "2.1.3".to_owned(),
            },
        ]
    );
}

#[cfg(unix)]
#[test]
fn dangling_links_are_skipped_when_listing() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path();
    write_manifest(
        dir,
        "grafana-clock-panel",
        "",
        r#"{"id":"grafana-clock-panel","type":"panel","name":"Clock","info":{"version":"2.1.3"}}"#,
    );
    std::os::unix::fs::symlink(dir.join("gone"), dir.join("stale-link")).unwrap();

    let plugins = Installer::list(dir).expect("listing");
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].id, "grafana-clock-panel");
}

#[test]
fn unpacks_stored_and_deflated_entries() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("plugins");

    let installed =
        installer().unpack(&plugin_archive("grafana-clock-panel", "2.1.3"), &dir).expect("unpack");
    assert_eq!(installed, vec!["grafana-clock-panel".to_owned()]);

    let module = std::fs::read_to_string(dir.join("grafana-clock-panel/module.js")).unwrap();
    assert_eq!(module, "define([], function () {});\n".repeat(50));

    let plugins = Installer::list(&dir).unwrap();
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].version, "2.1.3");
}

#[test]
fn loose_root_files_are_not_reported_as_plugins() {
    let root = tempfile::tempdir().unwrap();
    let archive = ZipBuilder::new()
        .file("LICENSE", b"Apache-2.0")
        .file("one/plugin.json", b"{}")
        .file("two/dist/plugin.json", b"{}")
        .finish();

    let installed = installer().unpack(&archive, root.path()).expect("unpack");
    assert_eq!(installed, vec!["one".to_owned(), "two".to_owned()]);
    assert!(root.path().join("LICENSE").is_file());
}

#[test]
fn traversal_entries_reject_the_whole_archive() {
    for name in ["../evil.txt", "nested/../../evil.txt", "/evil.txt", "good/../../evil.txt"] {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("plugins");
        let archive = ZipBuilder::new()
            .file("good/plugin.json", b"{}")
            .file(name, b"owned")
            .finish();

        let err = installer().unpack(&archive, &dir).expect_err(name);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{name}: {err}");
        assert!(!dir.exists(), "{name}: nothing is written for a rejected archive");
        assert!(!root.path().join("evil.txt").exists(), "{name} escaped");
    }
}

#[test]
fn backslash_entry_names_are_rejected() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("plugins");
    let archive = ZipBuilder::new()
        .file("good/plugin.json", b"{}")
        .file("..\\evil.txt", b"owned")
        .finish();

    let err = installer().unpack(&archive, &dir).expect_err("backslash name");
    assert!(matches!(err, MarketplaceError::Archive { .. }), "{err}");
    assert!(!dir.exists());
}

#[test]
fn declared_sizes_over_the_cap_reject_the_archive() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("plugins");
    let half = vec![b'a'; usize::try_from(UNPACK_LIMIT / 2).unwrap() + 1];
    let archive = ZipBuilder::new()
        .file("big/plugin.json", b"{}")
        .deflated("big/one.js", &half)
        .deflated("big/two.js", &half)
        .finish();

    let err = installer().unpack(&archive, &dir).expect_err("over the cap");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{err}");
    assert!(err.to_string().contains("unpacks to more than"), "{err}");
    assert!(!dir.exists());
}

#[test]
fn entries_inflating_past_their_header_are_cut_off() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("plugins");
    let bomb = vec![0_u8; usize::try_from(UNPACK_LIMIT * 4).unwrap()];
    let archive = ZipBuilder::new()
        .file("bomb/plugin.json", b"{}")
        .deflated_claiming("bomb/module.js", &bomb, 16)
        .finish();
    assert!(archive.len() < 64 * 1024);

    let err = installer().unpack(&archive, &dir).expect_err("inflates past the cap");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{err}");
    assert!(!dir.join("bomb/module.js").exists());
}

#[test]
fn unsupported_compression_rejects_the_whole_archive() {
    let root = tempfile::tempdir().unwrap();
    let archive = ZipBuilder::new()
        .file("good/plugin.json", b"{}")
        .raw("good/module.js", 12, b"BZh91AY&SY")
        .finish();

    let err = installer().unpack(&archive, root.path()).expect_err("bzip2 is not supported");
    assert!(matches!(err, MarketplaceError::Archive { .. }), "{err}");
    assert!(!root.path().join("good").exists());
}

#[test]
fn garbage_is_not_an_archive() {
    let root = tempfile::tempdir().unwrap();
    let err = installer().unpack(b"definitely not a zip", root.path()).expect_err("garbage");
    assert!(matches!(err, MarketplaceError::Archive { .. }), "{err}");
}

#[test]
fn remove_deletes_the_plugin_folder() {
    let root = tempfile::tempdir().unwrap();
    write_manifest(root.path(), "grafana-clock-panel", "dist", "{}");

    Installer::remove(root.path(), "grafana-clock-panel").expect("remove");
    assert!(!root.path().join("grafana-clock-panel").exists());

    let err = Installer::remove(root.path(), "grafana-clock-panel").expect_err("already gone");
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[test]
fn remove_rejects_unsafe_slugs() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("plugins");
    std::fs::create_dir_all(&dir).unwrap();

    for slug in ["..", ".", "", "a/b", "../plugins"] {
        let err = Installer::remove(&dir, slug).expect_err("unsafe slug");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{slug:?}");
    }
    assert!(dir.exists());
}

#[test]
fn blank_requested_dir_falls_back_to_configured() {
    let installer = installer();
    for requested in [None, Some("  "), Some("undefined"), Some("null"), Some(" undefined ")] {
        assert_eq!(
            installer.resolve_dir(requested),
            PathBuf::from("/var/lib/grafana/plugins"),
            "{requested:?}"
        );
    }
    assert_eq!(installer.resolve_dir(Some("/tmp/plugins")), PathBuf::from("/tmp/plugins"));
}
