use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};

use cookhub::config::ConfigArgs;
use cookhub::models::{time_ago, CommentId, PlanId, PlanStep, Post, PostId, PostView};
use cookhub::plans::PlanDraft;
use cookhub::posts::PostForm;
use cookhub::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "cookhub", about = "CookHUB community client")]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with e-mail and password
    Login {
        /// Defaults to the remembered e-mail
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: String,
        /// Remember the e-mail for next time
        #[arg(long)]
        remember: bool,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in with a Google ID token
    GoogleLogin { credential: String },
    Logout {
        /// Also forget the remembered e-mail
        #[arg(long)]
        forget: bool,
    },
    /// Show the logged-in user
    Whoami,
    /// Show the public feed
    Feed,
    /// Like or unlike a post
    Like { post_id: String },
    Comment { post_id: String, text: String },
    EditComment { comment_id: String, text: String },
    DeleteComment {
        post_id: String,
        comment_id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    #[command(subcommand)]
    Posts(PostCommand),
    #[command(subcommand)]
    Plans(PlanCommand),
    #[command(subcommand)]
    Communities(CommunityCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Subcommand, Debug)]
pub enum PostCommand {
    /// List your posts
    List,
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Image file to attach (repeatable, at most 3)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        #[arg(long)]
        private: bool,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Image file to add (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// Drop existing images before adding new ones
        #[arg(long)]
        clear_images: bool,
        #[arg(long, value_enum)]
        visibility: Option<Visibility>,
    },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
    Visibility {
        id: String,
        #[arg(value_enum)]
        visibility: Visibility,
    },
    /// Flip a post between public and private
    Toggle { id: String },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    List {
        /// Only plans whose title or category contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    Show {
        id: String,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        goal: String,
        /// Comma-separated skills
        #[arg(long)]
        skills: String,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        duration: Option<String>,
        /// "topic|resources|timeline" (repeatable)
        #[arg(long = "step", value_parser = parse_step)]
        steps: Vec<PlanStep>,
    },
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long)]
        skills: Option<String>,
        /// Replaces all steps when given
        #[arg(long = "step", value_parser = parse_step)]
        steps: Vec<PlanStep>,
    },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CommunityCommand {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
}

/// Parse a `topic|resources|timeline` step.
pub fn parse_step(s: &str) -> Result<PlanStep, String> {
    let parts: Vec<&str> = s.split('|').map(str::trim).collect();
    match parts.as_slice() {
        [topic, resources, timeline] => Ok(PlanStep::new(*topic, *resources, *timeline)),
        _ => Err(format!(
            "expected \"topic|resources|timeline\", got \"{}\"",
            s
        )),
    }
}

pub async fn run(command: Command, state: &AppState) -> anyhow::Result<()> {
    match command {
        Command::Login {
            email,
            password,
            remember,
        } => {
            let email = email
                .or_else(|| state.session.remembered_email())
                .context("No e-mail given and none remembered")?;
            let session = state.auth.login(&email, &password, remember).await?;
            println!("Welcome back, {}!", session.username);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            state.auth.register(&username, &email, &password).await?;
            println!("Registered successfully. Please log in.");
        }
        Command::GoogleLogin { credential } => {
            let session = state.auth.google_login(&credential).await?;
            println!("Welcome back, {}!", session.username);
        }
        Command::Logout { forget } => {
            state.auth.logout()?;
            if forget {
                state.session.forget_email()?;
            }
            println!("Logged out.");
        }
        Command::Whoami => match state.session.current_session() {
            Some(session) => println!("{}", session.username),
            None => println!("Not logged in."),
        },
        Command::Feed => {
            let views = state.feed.load_public_feed().await?;
            print_feed(state, &views);
        }
        Command::Like { post_id } => {
            let post_id = PostId::new(post_id);
            let views = state.feed.toggle_like(&post_id).await?;
            if let Some(view) = views.iter().find(|v| v.id() == &post_id) {
                println!(
                    "{} likes{}",
                    view.likes.like_count,
                    if view.likes.liked_by_viewer {
                        " (you like this)"
                    } else {
                        ""
                    }
                );
            }
        }
        Command::Comment { post_id, text } => {
            state.feed.add_comment(&PostId::new(post_id), &text).await?;
            println!("Comment added successfully!");
        }
        Command::EditComment { comment_id, text } => {
            state.feed.load_public_feed().await?;
            state
                .feed
                .edit_comment(&CommentId::new(comment_id), &text)
                .await?;
            println!("Comment updated successfully!");
        }
        Command::DeleteComment {
            post_id,
            comment_id,
            yes,
        } => {
            state.feed.load_public_feed().await?;
            let pending = state
                .feed
                .delete_comment(&PostId::new(post_id), &CommentId::new(comment_id))
                .await?;
            if confirm(&pending.to_string(), yes)? {
                state.feed.confirm_delete_comment(pending).await?;
                println!("Comment deleted successfully!");
            } else {
                pending.cancel();
            }
        }
        Command::Posts(cmd) => run_posts(cmd, state).await?,
        Command::Plans(cmd) => run_plans(cmd, state).await?,
        Command::Communities(cmd) => run_communities(cmd, state).await?,
    }
    Ok(())
}

async fn run_posts(cmd: PostCommand, state: &AppState) -> anyhow::Result<()> {
    let posts = &state.posts;
    match cmd {
        PostCommand::List => {
            let list = posts.load().await?;
            let stats = posts.stats().await;
            println!(
                "{} posts ({} public, {} private)",
                stats.total, stats.public, stats.private
            );
            for post in list {
                println!(
                    "[{}] {} ({}, {} images)",
                    post.id,
                    post.title,
                    if post.is_public { "public" } else { "private" },
                    post.images.len()
                );
            }
        }
        PostCommand::Create {
            title,
            content,
            images,
            private,
        } => {
            let mut form = PostForm::new();
            form.draft.title = title;
            form.draft.content = content;
            form.draft.is_public = !private;
            form.attach_images(&images).await?;
            let post = posts.submit(&mut form).await?;
            println!("Created post {}", post.id);
        }
        PostCommand::Edit {
            id,
            title,
            content,
            images,
            clear_images,
            visibility,
        } => {
            posts.load().await?;
            let mut form = PostForm::new();
            posts.begin_edit(&PostId::new(id), &mut form).await?;
            if let Some(title) = title {
                form.draft.title = title;
            }
            if let Some(content) = content {
                form.draft.content = content;
            }
            if let Some(visibility) = visibility {
                form.draft.is_public = visibility == Visibility::Public;
            }
            if clear_images {
                form.draft.images.clear();
            }
            form.attach_images(&images).await?;
            let post = posts.submit(&mut form).await?;
            println!("Updated post {}", post.id);
        }
        PostCommand::Delete { id, yes } => {
            posts.load().await?;
            let pending = posts.delete(&PostId::new(id)).await?;
            if confirm(&pending.to_string(), yes)? {
                posts.confirm_delete(pending).await?;
                println!("Post deleted.");
            } else {
                pending.cancel();
            }
        }
        PostCommand::Visibility { id, visibility } => {
            let post = posts
                .set_visibility(&PostId::new(id), visibility == Visibility::Public)
                .await?;
            print_visibility(&post);
        }
        PostCommand::Toggle { id } => {
            posts.load().await?;
            let post = posts.toggle_visibility(&PostId::new(id)).await?;
            print_visibility(&post);
        }
    }
    Ok(())
}

async fn run_plans(cmd: PlanCommand, state: &AppState) -> anyhow::Result<()> {
    let plans = &state.plans;
    match cmd {
        PlanCommand::List { filter } => {
            plans.list().await?;
            for plan in plans.filter(filter.as_deref().unwrap_or_default()).await {
                println!(
                    "[{}] {} ({}, {}%, {})",
                    plan.id,
                    plan.title,
                    plan.category_or_default(),
                    plan.progress(),
                    plan.duration.as_deref().unwrap_or("Unknown")
                );
            }
        }
        PlanCommand::Show { id } => {
            let plan = plans.get(&PlanId::new(id)).await?;
            println!("{} [{}]", plan.title, plan.category_or_default());
            println!("Goal: {}", plan.goal);
            println!("Skills: {}", plan.skill_tags().join(", "));
            println!("Progress: {}%", plan.progress());
            for (i, step) in plan.steps.iter().enumerate() {
                println!(
                    "  {}. {} ({}) - {}",
                    i + 1,
                    step.topic,
                    step.timeline,
                    step.resources
                );
            }
        }
        PlanCommand::Create {
            title,
            goal,
            skills,
            image,
            category,
            duration,
            steps,
        } => {
            let draft = PlanDraft {
                title,
                goal,
                skills,
                image,
                steps,
                category,
                duration,
            };
            let plan = plans.create(&draft).await?;
            println!("Created learning plan {}", plan.id);
        }
        PlanCommand::Update {
            id,
            title,
            goal,
            skills,
            steps,
        } => {
            let id = PlanId::new(id);
            let mut draft = PlanDraft::from(&plans.get(&id).await?);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(goal) = goal {
                draft.goal = goal;
            }
            if let Some(skills) = skills {
                draft.skills = skills;
            }
            if !steps.is_empty() {
                draft.steps = steps;
            }
            let plan = plans.update(&id, &draft).await?;
            println!("Updated learning plan {}", plan.id);
        }
        PlanCommand::Delete { id, yes } => {
            let pending = plans.delete(&PlanId::new(id));
            if confirm(&pending.to_string(), yes)? {
                plans.confirm_delete(pending).await?;
                println!("Learning plan deleted.");
            } else {
                pending.cancel();
            }
        }
    }
    Ok(())
}

async fn run_communities(cmd: CommunityCommand, state: &AppState) -> anyhow::Result<()> {
    match cmd {
        CommunityCommand::List => {
            for community in state.communities.list().await? {
                println!("{}: {}", community.name, community.description);
            }
        }
        CommunityCommand::Create { name, description } => {
            let community = state.communities.create(&name, &description).await?;
            println!("Created community {}", community.name);
        }
    }
    Ok(())
}

fn print_visibility(post: &Post) {
    println!(
        "Post {} is now {}",
        post.id,
        if post.is_public { "public" } else { "private" }
    );
}

fn print_feed(state: &AppState, views: &[PostView]) {
    let now = Utc::now();
    for view in views {
        let post = &view.post;
        let age = post
            .created_at
            .as_deref()
            .and_then(|at| time_ago(at, now))
            .unwrap_or_default();
        println!("[{}] {} by {} {}", post.id, post.title, post.author_username, age);
        println!("    {}", post.content);
        println!(
            "    {} likes{} | {} images | {} comments",
            view.likes.like_count,
            if view.likes.liked_by_viewer { " (liked)" } else { "" },
            post.images.len(),
            view.comments.len()
        );
        for comment in &view.comments {
            let mark = if state.feed.is_own_comment(comment) {
                " (yours)"
            } else {
                ""
            };
            println!(
                "      [{}] {}{}: {}",
                comment.id, comment.author_username, mark, comment.comment
            );
        }
    }
}

fn confirm(prompt: &str, assume_yes: bool) -> anyhow::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
