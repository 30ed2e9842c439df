// crates/credence-cli/src/commands.rs
//
// Subcommands of the credence binary and their handlers.
//
// Each handler drives one engine operation and prints its result as JSON.
// Errors propagate to main, which exits non-zero.

use std::fs;

use clap::Subcommand;
use serde::Serialize;

use credence_core::evidence::CrossCheckResult;
use credence_core::DomainCredibility;
use credence_community::{AnalysisRecord, Author, NewAnalysis};
use credence_scoring::AnalysisReport;

use crate::output::print_json;
use crate::services::Services;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the credibility of a URL's domain, creating it if unseen.
    Domain {
        /// URL or bare domain.
        url: String,
    },

    /// List the most credible domains, highest score first.
    TopDomains {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Record a finished cross-check for a URL.
    Analyze {
        #[arg(long)]
        url: String,
        /// JSON file with `supporting_sources` and `contradicting_sources`.
        #[arg(long)]
        evidence: String,
        /// Save the analysis to this user's history.
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        verdict: Option<String>,
    },

    /// Share a saved analysis to the community feed.
    Share {
        #[arg(long)]
        analysis: String,
        #[arg(long)]
        user: String,
    },

    /// Vote on a post or comment. Repeating a vote withdraws it.
    Vote {
        #[arg(long)]
        target: String,
        #[arg(long)]
        user: String,
        /// upvote or downvote.
        #[arg(long = "type")]
        vote_type: String,
        /// post or comment.
        #[arg(long, default_value = "post")]
        kind: String,
    },

    /// Comment on a post.
    Comment {
        #[arg(long)]
        post: String,
        #[arg(long)]
        user: String,
        content: String,
    },

    /// List comments on a post, oldest first.
    Comments {
        #[arg(long)]
        post: String,
        /// Include this user's vote on each comment.
        #[arg(long)]
        user: Option<String>,
    },

    /// List community posts, newest first.
    Posts {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Include this user's vote on each post.
        #[arg(long)]
        user: Option<String>,
    },

    /// List a user's saved analyses, newest first.
    History {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Delete a saved analysis owned by the user.
    Forget {
        #[arg(long)]
        analysis: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Serialize)]
struct AnalyzeOutput {
    report: AnalysisReport,
    credibility: DomainCredibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<AnalysisRecord>,
}

/// Run one subcommand against the wired services.
pub async fn run(cmd: &Command, services: &Services) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Domain { url } => {
            print_json(&services.domains.credibility(url).await?);
        }
        Command::TopDomains { limit } => {
            let domains = services.domains.top_domains(*limit).await?;
            print_json(&serde_json::json!({
                "total": domains.len(),
                "domains": domains,
            }));
        }
        Command::Analyze {
            url,
            evidence,
            user,
            title,
            verdict,
        } => {
            let contents = fs::read_to_string(evidence)?;
            let result: CrossCheckResult = serde_json::from_str(&contents)?;
            let report = services.analysis.record_analysis(url, &result).await?;
            let credibility = report.primary.credibility();

            let saved = match user {
                Some(user_id) => Some(
                    services
                        .history
                        .save_analysis(
                            user_id,
                            NewAnalysis {
                                url: url.clone(),
                                title: title.clone(),
                                summary: None,
                                verdict: verdict.clone(),
                                cross_check: result,
                                domain_credibility: Some(credibility.total_score),
                            },
                        )
                        .await?,
                ),
                None => None,
            };
            print_json(&AnalyzeOutput {
                report,
                credibility,
                saved,
            });
        }
        Command::Share { analysis, user } => {
            let post = services
                .board
                .share_to_community(analysis, &Author::new(user.as_str()))
                .await?;
            print_json(&post);
        }
        Command::Vote {
            target,
            user,
            vote_type,
            kind,
        } => {
            let outcome = services.votes.cast_vote(target, user, vote_type, kind).await?;
            if outcome.is_degraded() {
                tracing::warn!("Vote recorded; domain score not updated");
            }
            print_json(&outcome);
        }
        Command::Comment { post, user, content } => {
            let comment = services
                .board
                .add_comment(post, &Author::new(user.as_str()), content)
                .await?;
            print_json(&comment);
        }
        Command::Comments { post, user } => {
            print_json(&services.board.list_comments(post, user.as_deref()).await?);
        }
        Command::Posts { limit, user } => {
            print_json(&services.board.list_posts(*limit, user.as_deref()).await?);
        }
        Command::History { user, limit } => {
            print_json(&services.history.list_user_analyses(user, *limit).await?);
        }
        Command::Forget { analysis, user } => {
            services.history.delete_analysis(analysis, user).await?;
            print_json(&serde_json::json!({ "deleted": analysis }));
        }
    }
    Ok(())
}
