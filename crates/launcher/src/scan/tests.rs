use std::fs;
use std::os::unix::fs::{PermissionsExt, symlink};
use std::sync::mpsc;
use std::time::Duration;

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

use pretty_assertions::assert_eq;

use super::*;

struct Fixture {
	_root: tempfile::TempDir,
	apps: PathBuf,
	resolver: Resolver,
}

impl Fixture {
	fn new(executables: &[&str]) -> Self {
		let root = tempfile::tempdir().expect("must create tempdir");
		let bin = root.path().join("bin");
		let apps = root.path().join("apps");
		fs::create_dir_all(&bin).expect("must create bin");
		fs::create_dir_all(&apps).expect("must create apps");
		for name in executables {
			let path = bin.join(name);
			fs::write(&path, "#!/bin/sh\n").expect("must write executable");
			fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("must chmod");
		}
		let resolver = Resolver::new(Some(bin.into_os_string()));
		Self { _root: root, apps, resolver }
	}

	fn entry(&self, relative: &str, exec: &str) -> PathBuf {
		let path = self.apps.join(relative);
		fs::create_dir_all(path.parent().expect("has parent")).expect("must create parent");
		fs::write(&path, format!("[Desktop Entry]\nType=Application\nExec={exec}\n")).expect("must write entry");
		path
	}

	fn scan(&self) -> (Registry, String) {
		let mut registry = Registry::new();
		let mut out = Vec::new();
		Scanner::new(&mut registry, &self.resolver, &mut out).scan(&self.apps).expect("scan must succeed");
		(registry, String::from_utf8(out).expect("utf8 output"))
	}
}

fn names(registry: &Registry) -> Vec<String> {
	registry.sorted().into_iter().map(|name| name.to_string()).collect()
}

#[test]
fn finds_entries_recursively() {
	let fixture = Fixture::new(&["alpha", "beta"]);
	fixture.entry("alpha.desktop", "alpha %U");
	fixture.entry("nested/deeper/beta.desktop", "/usr/bin/beta");
	fixture.entry("nested/notes.txt", "alpha");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["alpha", "beta"]);
}

#[test]
fn reports_each_accepted_command_with_its_source() {
	let fixture = Fixture::new(&["alpha"]);
	let entry = fixture.entry("alpha.desktop", "alpha");

	let (_, out) = fixture.scan();
	assert_eq!(out, format!("+ alpha ({})\n", entry.display()));
}

#[test]
fn case_variants_collapse_to_one_entry() {
	let fixture = Fixture::new(&["gimp"]);
	fixture.entry("a.desktop", "gimp");
	fixture.entry("b.desktop", "GIMP");
	fixture.entry("c.desktop", "Gimp %f");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["gimp"]);
}

#[test]
fn lowercase_spelling_is_preferred() {
	let fixture = Fixture::new(&["blender", "Blender"]);
	fixture.entry("blender.desktop", "Blender");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["blender"]);
}

#[test]
fn original_casing_is_used_when_only_it_resolves() {
	let fixture = Fixture::new(&["MuseScore"]);
	fixture.entry("musescore.desktop", "MuseScore");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["MuseScore"]);
}

#[test]
fn unresolvable_and_terminal_entries_are_dropped() {
	let fixture = Fixture::new(&["htop", "present"]);
	fixture.entry("missing.desktop", "absent-program");
	fixture.entry("present.desktop", "present");
	let htop = fixture.apps.join("htop.desktop");
	fs::write(&htop, "[Desktop Entry]\nExec=htop\nTerminal=True\n").expect("must write entry");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["present"]);
}

#[test]
fn unreadable_descriptor_is_skipped() {
	let fixture = Fixture::new(&["alpha"]);
	symlink(fixture.apps.join("nowhere"), fixture.apps.join("dangling.desktop")).expect("must create symlink");
	fixture.entry("alpha.desktop", "alpha");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["alpha"]);
}

#[test]
fn fifo_named_like_a_descriptor_is_not_opened() {
	let fixture = Fixture::new(&["alpha"]);
	mkfifo(&fixture.apps.join("stuck.desktop"), Mode::S_IRWXU).expect("must create fifo");
	fixture.entry("alpha.desktop", "alpha");

	let (done, finished) = mpsc::channel();
	std::thread::spawn(move || {
		let _ = done.send(names(&fixture.scan().0));
	});
	let found = finished.recv_timeout(Duration::from_secs(5)).expect("scan must not block on a fifo");
	assert_eq!(found, vec!["alpha"]);
}

#[test]
fn fifo_is_not_a_descriptor_record() {
	let dir = tempfile::tempdir().expect("must create tempdir");
	let fifo = dir.path().join("stuck.desktop");
	mkfifo(&fifo, Mode::S_IRWXU).expect("must create fifo");

	let record = crate::entry::read_descriptor(&fifo).expect("metadata must be readable");
	assert!(record.is_none());
}

#[test]
fn symlinked_directories_are_walked() {
	let fixture = Fixture::new(&["alpha", "beta"]);
	let elsewhere = fixture.apps.parent().expect("has parent").join("elsewhere");
	fs::create_dir_all(&elsewhere).expect("must create target dir");
	fs::write(elsewhere.join("beta.desktop"), "[Desktop Entry]\nExec=beta\n").expect("must write entry");
	symlink(&elsewhere, fixture.apps.join("linked")).expect("must create symlink");
	fixture.entry("alpha.desktop", "alpha");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["alpha", "beta"]);
}

#[test]
fn symlink_loop_is_skipped() {
	let fixture = Fixture::new(&["alpha"]);
	fixture.entry("nested/alpha.desktop", "alpha");
	symlink(&fixture.apps, fixture.apps.join("nested/back")).expect("must create symlink");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["alpha"]);
}

#[test]
fn symlinked_descriptor_is_read() {
	let fixture = Fixture::new(&["alpha"]);
	let target = fixture.entry("store/alpha.entry", "alpha");
	symlink(&target, fixture.apps.join("alpha.desktop")).expect("must create symlink");

	let (registry, _) = fixture.scan();
	assert_eq!(names(&registry), vec!["alpha"]);
}

#[test]
fn already_registered_commands_are_not_reannounced() {
	let fixture = Fixture::new(&["alpha"]);
	fixture.entry("alpha.desktop", "alpha");

	let mut registry = Registry::new();
	registry.add(CommandName::from("ALPHA")).expect("add");
	let mut out = Vec::new();
	let accepted = Scanner::new(&mut registry, &fixture.resolver, &mut out).scan(&fixture.apps).expect("scan");
	assert_eq!(accepted, 0);
	assert!(out.is_empty());
	assert_eq!(registry.len(), 1);
}

#[test]
fn missing_root_is_fatal() {
	let fixture = Fixture::new(&[]);
	let mut registry = Registry::new();
	let mut out = Vec::new();
	let missing = fixture.apps.join("does-not-exist");
	let err = Scanner::new(&mut registry, &fixture.resolver, &mut out).scan(&missing).expect_err("must fail");
	assert!(matches!(err, ScanError::Walk { .. }));
	assert!(err.to_string().starts_with("unable to walk '"));
}

#[test]
fn scan_all_visits_every_root_in_order() {
	let first = Fixture::new(&["alpha", "beta"]);
	first.entry("alpha.desktop", "alpha");
	let other = tempfile::tempdir().expect("must create tempdir");
	fs::write(other.path().join("beta.desktop"), "[Desktop Entry]\nExec=beta\n").expect("must write entry");

	let mut registry = Registry::new();
	let mut out = Vec::new();
	let roots = vec![first.apps.clone(), other.path().to_path_buf()];
	let accepted = Scanner::new(&mut registry, &first.resolver, &mut out).scan_all(&roots).expect("scan");
	assert_eq!(accepted, 2);
	let out = String::from_utf8(out).expect("utf8");
	assert!(out.lines().next().expect("first line").starts_with("+ alpha"));
}

#[test]
fn tight_handle_budget_still_visits_everything() {
	let fixture = Fixture::new(&["alpha", "beta", "gamma"]);
	fixture.entry("a/alpha.desktop", "alpha");
	fixture.entry("a/b/beta.desktop", "beta");
	fixture.entry("a/b/c/gamma.desktop", "gamma");

	let mut registry = Registry::new();
	let mut out = Vec::new();
	Scanner::new(&mut registry, &fixture.resolver, &mut out).with_max_open(1).scan(&fixture.apps).expect("scan");
	assert_eq!(names(&registry), vec!["alpha", "beta", "gamma"]);
}

#[test]
fn handle_budget_leaves_room_for_reserved_descriptors() {
	// POSIX guarantees at least twenty descriptors per process.
	assert!(max_open_dirs() >= POSIX_OPEN_MAX - RESERVED_FDS);
}
