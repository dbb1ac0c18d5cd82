//! Reference names and the packed-refs file

pub mod packed_refs;
pub mod ref_name;
pub mod revision;

use regex::Regex;
use std::sync::LazyLock;

pub const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";
pub const SYMREF_REGEX: &str = r"^ref: (.+)$";
pub const PARENT_REGEX: &str = r"^(.+)\^$";
pub const ANCESTOR_REGEX: &str = r"^(.+)\~(\d+)$";

pub static INVALID_REF_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(INVALID_REF_NAME_REGEX).expect("invalid ref name regex"));
pub static SYMREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SYMREF_REGEX).expect("invalid symref regex"));
pub static PARENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PARENT_REGEX).expect("invalid parent regex"));
pub static ANCESTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ANCESTOR_REGEX).expect("invalid ancestor regex"));

pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// File summarizing many refs, relative to the git directory
pub const PACKED_REFS: &str = "packed-refs";

/// Directory every non-HEAD ref lives under
pub const REFS_DIR: &str = "refs";
