use chrono::{DateTime, FixedOffset, TimeZone};
use git2::{Oid, Repository as Git2Repo, Sort};
use std::path::Path;
use tracing::debug;

use crate::domain::Tag;
use crate::error::{FlexVersionError, Result};
use crate::git::{CommitInfo, CommitIter};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn commit_info(&self, oid: Oid) -> Result<CommitInfo> {
        let commit = self.repo.find_commit(oid)?;

        let author = commit.author();
        let author = format!(
            "{} <{}>",
            author.name().unwrap_or("unknown"),
            author.email().unwrap_or("")
        );

        let when = commit.committer().when();
        let time = commit_time(when.seconds(), when.offset_minutes()).ok_or_else(|| {
            FlexVersionError::config(format!("Commit {} has an invalid timestamp", oid))
        })?;

        Ok(CommitInfo {
            sha: oid.to_string(),
            message: commit.message().unwrap_or("").to_string(),
            message_short: commit.summary().unwrap_or("").to_string(),
            author,
            time,
            parent_count: commit.parent_count(),
        })
    }
}

fn commit_time(seconds: i64, offset_minutes: i32) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(offset_minutes * 60)?;
    offset.timestamp_opt(seconds, 0).single()
}

impl super::Repository for Git2Repository {
    fn path(&self) -> String {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .display()
            .to_string()
    }

    fn current_branch_name(&self) -> Result<String> {
        let head = self.repo.head()?;
        if self.repo.head_detached()? {
            return Ok("HEAD".to_string());
        }

        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    fn tags(&self) -> Result<Vec<Tag>> {
        let mut refs = Vec::new();
        self.repo.tag_foreach(|oid, name_bytes| {
            match std::str::from_utf8(name_bytes) {
                Ok(name) => {
                    let name = name.strip_prefix("refs/tags/").unwrap_or(name);
                    refs.push((oid, name.to_string()));
                }
                Err(_) => debug!("Skipping tag {} - name is not valid UTF-8", oid),
            }
            true
        })?;

        let mut tags = Vec::with_capacity(refs.len());
        for (oid, name) in refs {
            let target = match self
                .repo
                .find_object(oid, None)
                .and_then(|obj| obj.peel_to_commit())
            {
                Ok(commit) => commit.id().to_string(),
                Err(e) => {
                    debug!(tag = %name, error = %e, "Tag does not point at a commit, skipping");
                    continue;
                }
            };

            let tag = match self.repo.find_tag(oid) {
                Ok(annotation) => {
                    Tag::annotated(name, annotation.message().unwrap_or(""), target)
                }
                Err(_) => Tag::lightweight(name, target),
            };
            tags.push(tag);
        }

        Ok(tags)
    }

    fn walk_history(&self, first_parent_only: bool) -> Result<CommitIter<'_>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        if first_parent_only {
            revwalk.simplify_first_parent()?;
        }

        Ok(Box::new(revwalk.map(move |oid| {
            let oid = oid?;
            self.commit_info(oid)
        })))
    }
}
