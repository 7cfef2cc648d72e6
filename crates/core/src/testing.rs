// Shell-script stand-in for the cq binary, shared by tests across crates
//
// The script is written exactly once per test binary, before any test can
// spawn it, so no test ever executes a file that is still open for writing.

use crate::bridge::ProcessBridge;
use crate::decoder::CqDecoder;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Behaviour keyed on arguments:
/// - `--version` prints `cq 0.0.0-test`
/// - `--check <hex>`: `00…` exits 1, `ff…` exits 2 with stderr, `ee…` exits 3 silently, else 0
/// - `addr <address> [--json]`: `addr1…`/`stake1…` decode, anything else exits 1
/// - otherwise a query: last argument `00…` exits 1 (`malformed CBOR`),
///   a `fee` path prints `170000`, `--json` wraps the arguments in a JSON
///   object, and anything else echoes the arguments
const FAKE_CQ: &str = r#"#!/bin/sh
case "$1" in
  --version)
    echo "cq 0.0.0-test"
    exit 0
    ;;
  --check)
    case "$2" in
      00*) echo "invalid transaction" >&2; exit 1 ;;
      ff*) echo "decoder crashed" >&2; exit 2 ;;
      ee*) exit 3 ;;
      *) exit 0 ;;
    esac
    ;;
  addr)
    case "$2" in
      addr1*|stake1*)
        if [ "$3" = "--json" ]; then
          printf '{"address":"%s","network":"mainnet","type":"base"}\n' "$2"
        else
          echo "mainnet base address"
        fi
        exit 0
        ;;
      *)
        echo "invalid address: $2" >&2
        exit 1
        ;;
    esac
    ;;
esac

for arg in "$@"; do last="$arg"; done
case "$last" in
  00*) echo "malformed CBOR" >&2; exit 1 ;;
esac

case " $* " in
  *" --json "*) printf '{"args":"%s"}\n' "$*" ;;
  *" fee "*) echo "170000" ;;
  *) printf '%s\n' "$*" ;;
esac
"#;

static FAKE_CQ_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

/// Path to the fake decoder script
pub fn fake_decoder_path() -> PathBuf {
    let dir = FAKE_CQ_DIR.get_or_init(|| {
        let dir = tempfile::tempdir().expect("create temp dir for fake cq");
        write_script(&dir.path().join("cq"));
        dir
    });
    dir.path().join("cq")
}

/// A decoder wired to the fake script
pub fn fake_decoder() -> CqDecoder {
    let bridge = ProcessBridge::new(fake_decoder_path()).expect("fake cq exists");
    CqDecoder::new(bridge)
}

#[cfg(unix)]
fn write_script(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, FAKE_CQ).expect("write fake cq");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("make fake cq executable");
}

#[cfg(not(unix))]
fn write_script(path: &Path) {
    std::fs::write(path, FAKE_CQ).expect("write fake cq");
}
