use std::path::Path;

use walkdir::WalkDir;

// `include_dir!` and askama only track files they already know about; new files
// under these directories must still trigger a rebuild.
const WATCHED_DIRS: [&str; 2] = ["static", "templates"];

fn main() {
    for dir in WATCHED_DIRS {
        let root = Path::new(dir);
        println!("cargo:rerun-if-changed={}", root.display());

        if root.is_dir() {
            for entry in WalkDir::new(root).into_iter().flatten() {
                println!("cargo:rerun-if-changed={}", entry.path().display());
            }
        }
    }
}
