use std::hint::black_box;
use std::path::PathBuf;
use std::process::Command;

use brunch::{Bench, Benches};
use fuzzy_matcher::FuzzyMatcher;
use quickmatch_matcher::Matcher;

fn bench_dir() -> PathBuf {
    std::env::var_os("BENCHMARK_DIR")
        .expect("the BENCHMARK_DIR must be set to the directory to traverse for the benchmark")
        .into()
}

fn checkout_linux_if_needed() {
    let linux_dir = bench_dir();
    if !linux_dir.exists() {
        println!("will git clone linux...");
        let output = Command::new("git")
            .arg("clone")
            .arg("https://github.com/BurntSushi/linux.git")
            .arg("--depth")
            .arg("1")
            .arg("--branch")
            .arg("master")
            .arg("--single-branch")
            .arg(&linux_dir)
            .stdout(std::process::Stdio::inherit())
            .status()
            .expect("failed to git clone linux");
        println!("did git clone linux...{:?}", output);
    }
}

fn main() {
    checkout_linux_if_needed();
    let dir = bench_dir();
    let paths: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|path| {
            let dent = path.ok()?;
            Some(dent.into_path().to_string_lossy().into_owned())
        })
        .collect();
    let mut matcher = Matcher::default();
    let skim = fuzzy_matcher::skim::SkimMatcherV2::default();

    let needles = ["never_matches", "copying", "/doc/kernel", "//.h"];
    // Announce that we've started.
    ::std::eprint!("\x1b[1;38;5;199mStarting:\x1b[0m Running benchmark(s). Stand by!\n\n");
    let mut benches = Benches::default();
    for needle in needles {
        println!("running {needle:?}...");
        benches.push(Bench::new(format!("quickmatch {needle:?}")).run(|| {
            for haystack in &paths {
                black_box(matcher.score(needle.as_bytes(), haystack.as_bytes()));
            }
        }));
        benches.push(Bench::new(format!("skim {needle:?}")).run(|| {
            for haystack in &paths {
                let res = skim.fuzzy_match(haystack, needle);
                let _ = black_box(res);
            }
        }));
    }
    benches.finish();
}
