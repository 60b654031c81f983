mod cli;
mod commands;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    init_logging(matches!(command, cli::Command::Tui));
    let store = args.store;
    match command {
        cli::Command::Init { empty } => commands::init(store, empty),
        cli::Command::List {
            tab,
            category,
            tag,
            query,
            any_tags,
            any_categories,
            favorites_only,
            pinned_only,
            sort,
            asc,
        } => commands::list(
            store,
            commands::ListOptions {
                tab: tab.into(),
                category,
                tag,
                query,
                any_tags,
                any_categories,
                favorites_only,
                pinned_only,
                sort_by: sort.into(),
                sort_direction: cli::direction(asc),
            },
        ),
        cli::Command::Show { note_id } => commands::show(store, note_id),
        cli::Command::Add {
            title,
            content,
            tags,
            category,
            pin,
            favorite,
        } => commands::add(store, title, content, tags, category, pin, favorite),
        cli::Command::Edit {
            note_id,
            title,
            content,
            tags,
            clear_tags,
            category,
        } => commands::edit(store, note_id, title, content, tags, clear_tags, category),
        cli::Command::Pin { note_id } => commands::toggle_pin(store, note_id),
        cli::Command::Favorite { note_id } => commands::toggle_favorite(store, note_id),
        cli::Command::Delete { note_id } => commands::delete(store, note_id),
        cli::Command::Restore { note_id } => commands::restore(store, note_id),
        cli::Command::Purge { note_id } => commands::purge(store, note_id),
        cli::Command::Category { action } => match action {
            cli::CategoryAction::List => commands::list_categories(store),
            cli::CategoryAction::Add { name, icon } => commands::add_category(store, name, icon),
            cli::CategoryAction::Remove { id } => commands::remove_category(store, id),
        },
        cli::Command::Tag { action } => match action {
            cli::TagAction::List => commands::list_tags(store),
            cli::TagAction::Add {
                name,
                color,
                random_color,
            } => commands::add_tag(store, name, color, random_color),
            cli::TagAction::Remove { id } => commands::remove_tag(store, id),
        },
        cli::Command::Tui => commands::tui(store),
    }
}

/// Logs go to stderr; the TUI stays silent unless `RUST_LOG` asks otherwise.
fn init_logging(tui: bool) {
    let default_filter = if tui { "off" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}
