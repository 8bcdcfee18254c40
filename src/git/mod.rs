//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the read-only
//! repository queries an analysis needs, allowing for a real libgit2 backend
//! and a mock backend for testing.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations include:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: An in-memory implementation for testing
//!
//! # Usage
//!
//! Analysis code depends on the [Repository] trait rather than concrete
//! implementations.
//!
//! ```rust
//! # use flex_version::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> Result<(), Box<dyn std::error::Error>> {
//! let branch = repo.current_branch_name()?;
//! for commit in repo.walk_history(true)?.take(10) {
//!     let commit = commit?;
//!     println!("{} {} {}", branch, commit.sha, commit.message_short);
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use chrono::{DateTime, FixedOffset};

use crate::domain::Tag;
use crate::error::Result;

/// Commit information as read from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// The full commit sha
    pub sha: String,
    /// The full commit message
    pub message: String,
    /// The first line of the message
    pub message_short: String,
    /// Author display string (`Name <email>`)
    pub author: String,
    /// Committer timestamp
    pub time: DateTime<FixedOffset>,
    pub parent_count: usize,
}

/// Lazily produced commits, newest first.
pub type CommitIter<'a> = Box<dyn Iterator<Item = Result<CommitInfo>> + 'a>;

/// Read-only repository queries used by the analysis
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// underlying errors (like `git2::Error`) to [crate::error::FlexVersionError].
///
/// ## Implementations
///
/// - [Git2Repository](repository::Git2Repository): Real Git implementation using the `git2` crate
/// - [MockRepository](mock::MockRepository): Test implementation with a scripted history
pub trait Repository {
    /// Location of the repository, as reported in results
    fn path(&self) -> String;

    /// Friendly name of the branch HEAD points at
    ///
    /// Returns `HEAD` when the head is detached.
    fn current_branch_name(&self) -> Result<String>;

    /// All tags in the repository
    ///
    /// Each tag carries the sha of the commit it ultimately points at. Tags
    /// that do not resolve to a commit are left out.
    fn tags(&self) -> Result<Vec<Tag>>;

    /// Walk history from HEAD, newest first in topological-time order
    ///
    /// # Arguments
    /// * `first_parent_only` - Follow only the first parent of merges
    ///
    /// The iterator is lazy so callers can stop as soon as they have what
    /// they need.
    fn walk_history(&self, first_parent_only: bool) -> Result<CommitIter<'_>>;
}
