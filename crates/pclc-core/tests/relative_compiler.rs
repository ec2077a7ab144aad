//! Building with a compiler given as a relative path.
//!
//! Kept in its own test binary because it changes the process working
//! directory.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use pclc_core::{BuildOptions, CompilerConfig, NativeCompiler, Pipeline};
use tempfile::TempDir;

#[test]
fn test_relative_compiler_path() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let compiler = dir.path().join("tools").join("mycc");
    fs::create_dir_all(compiler.parent().expect("compiler dir")).expect("Failed to create tools/");
    fs::write(
        &compiler,
        "#!/bin/sh\n\
         out=''\n\
         while [ $# -gt 0 ]; do\n\
         \x20 if [ \"$1\" = \"-o\" ]; then shift; out=\"$1\"; fi\n\
         \x20 shift\n\
         done\n\
         : > \"$out\"\n",
    )
    .expect("Failed to write compiler stub");
    let mut perms = fs::metadata(&compiler).expect("stat stub").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&compiler, perms).expect("chmod stub");

    fs::write(
        dir.path().join("doc.pcl"),
        "%c name=m export=f\nint f(void) { return 0; }\n%endc\n",
    )
    .expect("Failed to write document");

    std::env::set_current_dir(dir.path()).expect("Failed to enter temp dir");

    let config = CompilerConfig::default().with_compiler("tools/mycc");
    let compiler = NativeCompiler::new(config).expect("Failed to locate compiler");
    assert!(compiler.toolchain().compiler().is_absolute());

    let report = Pipeline::new(compiler, BuildOptions::default())
        .build(Path::new("doc.pcl"))
        .expect("Failed to build with a relative compiler path");

    assert!(report.modules["m"].library.is_file());
    assert!(report.entry.is_file());
}
