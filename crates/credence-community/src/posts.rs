// crates/credence-community/src/posts.rs
//
// CommunityBoard: the shared feed of analyses and the comments on them.
//
// A post's id is the id of the analysis it was shared from, so sharing the
// same analysis twice lands on the same key and returns the existing post.
// Adding a comment writes the comment and bumps the post's comment_count in
// one transaction.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use credence_core::document::{Collection, DocKey, Write};
use credence_core::error::CredenceError;
use credence_core::traits::DocumentStore;
use credence_core::vote::{TargetRef, VoteType};
use credence_store::{run_transaction, with_retry, RetryPolicy, TxnPlan};

use crate::analyses::analysis_key;
use crate::ledger::{validate_id, VoteLedger};
use crate::models::{AnalysisRecord, Author, CommentRecord, CommentView, PostRecord, PostView};

fn post_key(id: &str) -> DocKey {
    DocKey::new(Collection::CommunityPosts, id)
}

fn comment_key(id: &str) -> DocKey {
    DocKey::new(Collection::PostComments, id)
}

#[derive(Clone)]
pub struct CommunityBoard {
    store: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
    ledger: VoteLedger,
}

impl CommunityBoard {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        let ledger = VoteLedger::new(store.clone(), policy);
        Self { store, policy, ledger }
    }

    /// Publish an analysis to the feed. Only the analysis owner may share it.
    ///
    /// Idempotent per analysis: a second share returns the existing post
    /// with its counters intact.
    pub async fn share_to_community(
        &self,
        analysis_id: &str,
        author: &Author,
    ) -> Result<PostRecord, CredenceError> {
        validate_id("analysis", analysis_id)?;
        validate_id("user", &author.id)?;

        let a_key = analysis_key(analysis_id);
        let p_key = post_key(analysis_id);
        let keys = [a_key.clone(), p_key.clone()];

        let (post, created) = run_transaction(self.store.as_ref(), &self.policy, &keys, |snapshot| {
            let analysis: AnalysisRecord = snapshot
                .decode(&a_key)?
                .ok_or_else(|| CredenceError::NotFound(format!("analysis {}", analysis_id)))?;
            if analysis.user_id != author.id {
                return Err(CredenceError::Unauthorized(format!(
                    "analysis {} is not owned by {}",
                    analysis_id, author.id
                )));
            }

            if let Some(existing) = snapshot.decode::<PostRecord>(&p_key)? {
                return Ok(TxnPlan::read_only((existing, false)));
            }

            let post = PostRecord {
                id: analysis.id.clone(),
                analysis_id: analysis.id,
                author: author.clone(),
                url: Some(analysis.url),
                title: analysis.title,
                summary: analysis.summary,
                verdict: analysis.verdict,
                cross_check: analysis.cross_check,
                domain_credibility: analysis.domain_credibility,
                upvotes: 0,
                downvotes: 0,
                comment_count: 0,
                created_at: Utc::now(),
            };
            Ok(TxnPlan::new(vec![Write::put(p_key.clone(), &post)?], (post, true)))
        })
        .await?;

        if created {
            tracing::info!(post_id = %post.id, author = %author.id, "shared analysis to community");
        }
        Ok(post)
    }

    pub async fn get_post(&self, id: &str, viewer: Option<&str>) -> Result<PostView, CredenceError> {
        let post = self.load_post(id).await?;
        let user_vote = self.viewer_vote(&TargetRef::post(id), viewer).await?;
        Ok(PostView { post, user_vote })
    }

    /// Newest posts first, each with the viewer's vote if a viewer is given.
    pub async fn list_posts(
        &self,
        limit: usize,
        viewer: Option<&str>,
    ) -> Result<Vec<PostView>, CredenceError> {
        let docs = with_retry(&self.policy, || self.store.list(Collection::CommunityPosts)).await?;
        let mut posts = docs
            .into_iter()
            .map(|(_, doc)| doc.decode::<PostRecord>())
            .collect::<Result<Vec<_>, _>>()?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        posts.truncate(limit);

        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            let user_vote = self.viewer_vote(&TargetRef::post(post.id.as_str()), viewer).await?;
            views.push(PostView { post, user_vote });
        }
        Ok(views)
    }

    /// Add a comment to a post.
    pub async fn add_comment(
        &self,
        post_id: &str,
        author: &Author,
        content: &str,
    ) -> Result<CommentRecord, CredenceError> {
        validate_id("post", post_id)?;
        validate_id("user", &author.id)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(CredenceError::InvalidArgument("comment content is empty".into()));
        }

        let comment = CommentRecord {
            id: Uuid::now_v7().to_string(),
            post_id: post_id.to_string(),
            author: author.clone(),
            content: content.to_string(),
            upvotes: 0,
            downvotes: 0,
            created_at: Utc::now(),
        };
        let p_key = post_key(post_id);
        let c_key = comment_key(&comment.id);
        let keys = [p_key.clone(), c_key.clone()];

        run_transaction(self.store.as_ref(), &self.policy, &keys, |snapshot| {
            let mut post: PostRecord = snapshot
                .decode(&p_key)?
                .ok_or_else(|| CredenceError::NotFound(format!("post {}", post_id)))?;
            if snapshot.get(&c_key).is_some() {
                return Err(CredenceError::Conflict(format!("comment id {} already taken", comment.id)));
            }
            post.comment_count = post.comment_count.saturating_add(1);
            Ok(TxnPlan::new(
                vec![Write::put(p_key.clone(), &post)?, Write::put(c_key.clone(), &comment)?],
                (),
            ))
        })
        .await?;

        tracing::debug!(post_id, comment_id = %comment.id, "added comment");
        Ok(comment)
    }

    /// Comments on a post, oldest first. `NotFound` if the post does not exist.
    pub async fn list_comments(
        &self,
        post_id: &str,
        viewer: Option<&str>,
    ) -> Result<Vec<CommentView>, CredenceError> {
        self.load_post(post_id).await?;

        let docs = with_retry(&self.policy, || self.store.list(Collection::PostComments)).await?;
        let mut comments = Vec::new();
        for (_, doc) in docs {
            let comment: CommentRecord = doc.decode()?;
            if comment.post_id == post_id {
                comments.push(comment);
            }
        }
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let user_vote = self
                .viewer_vote(&TargetRef::comment(comment.id.as_str()), viewer)
                .await?;
            views.push(CommentView { comment, user_vote });
        }
        Ok(views)
    }

    async fn load_post(&self, id: &str) -> Result<PostRecord, CredenceError> {
        let key = post_key(id);
        with_retry(&self.policy, || self.store.get(&key))
            .await?
            .ok_or_else(|| CredenceError::NotFound(format!("post {}", id)))?
            .decode()
    }

    async fn viewer_vote(
        &self,
        target: &TargetRef,
        viewer: Option<&str>,
    ) -> Result<Option<VoteType>, CredenceError> {
        match viewer {
            Some(user_id) if !user_id.is_empty() => self.ledger.current_vote(target, user_id).await,
            _ => Ok(None),
        }
    }
}
