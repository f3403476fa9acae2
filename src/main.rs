use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use inquire::error::InquireResult;
use tracing_subscriber::EnvFilter;

mod api;
mod background;
mod bridge;
mod cli;
mod config;
mod popup;
mod scrape;
mod snapshot;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use api::{AdminApi, AdminClient, Session};
use bridge::ContentScript;
use cli::PageArgs;
use config::Config;
use popup::{PopupState, Tone, View};
use scrape::FetchOptions;
use snapshot::{Extractor, HttpImageFetcher, HttpPageSource, PageSource, RawPage, StaticPageSource};
use storage::BackendLocal;

fn page_source(page: &PageArgs, fetch: FetchOptions) -> anyhow::Result<Arc<dyn PageSource>> {
    match &page.html {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(Arc::new(StaticPageSource::new(RawPage::new(&page.url, html))))
        }
        None => Ok(Arc::new(HttpPageSource::new(&page.url, fetch))),
    }
}

fn admin_client(config: &Config) -> anyhow::Result<AdminClient> {
    let store = BackendLocal::new(config.base_path())
        .with_context(|| format!("opening {}", config.base_path()))?;
    let session = Session::load(&store)?;
    Ok(AdminClient::new(&config.api, session)?.with_store(Box::new(store)))
}

fn extractor(config: &Config) -> Arc<Extractor> {
    Arc::new(Extractor::new(
        config.extraction.extract_options(),
        config.extraction.retry_policy(),
    ))
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let config = Config::load()?;
    let fetch = config.extraction.fetch_options();

    match args.command {
        cli::Command::Scan {
            page,
            no_images,
            report,
        } => {
            let source = page_source(&page, fetch.clone())?;
            let fetcher = HttpImageFetcher::new(fetch);
            let fetcher: Option<&dyn snapshot::ImageFetcher> =
                if no_images { None } else { Some(&fetcher) };

            let extraction = snapshot::extract_snapshot(&extractor(&config), source.as_ref(), fetcher);

            if extraction.fell_back {
                log::warn!(
                    "no usable product data after {} attempt(s), showing fallback",
                    extraction.attempts
                );
            }
            if report {
                match &extraction.report {
                    Some(report) => {
                        for collector in &report.collectors {
                            eprintln!(
                                "collector {:<16} images +{:<3} fields [{}]",
                                collector.name,
                                collector.images,
                                collector.fields.join(", ")
                            );
                        }
                        for decision in &report.field_decisions {
                            eprintln!(
                                "{:<8} <- {:<24} {}",
                                decision.field,
                                decision.winner,
                                decision.value_preview.as_deref().unwrap_or("-")
                            );
                        }
                    }
                    None => eprintln!("no report: extraction fell back"),
                }
            }

            println!("{}", serde_json::to_string_pretty(&extraction.snapshot)?);
            Ok(())
        }

        cli::Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => inquire::Password::new("Password:")
                    .without_confirmation()
                    .prompt()?,
            };

            let client = admin_client(&config)?;
            let mut state = PopupState::default();
            state.login(&client, &email, &password);

            match (state.view, state.notice) {
                (View::Save, _) => {
                    println!("Signed in as {email}");
                    Ok(())
                }
                (_, Some(notice)) => bail!(notice.text),
                (_, None) => bail!(popup::MSG_LOGIN_FAILED),
            }
        }

        cli::Command::Logout {} => {
            admin_client(&config)?.logout()?;
            println!("Signed out");
            Ok(())
        }

        cli::Command::Whoami {} => {
            let client = admin_client(&config)?;
            if client.session().is_empty() {
                println!("Not signed in");
            } else if client.check_auth() {
                println!("Signed in to {}", config.api.base_url);
            } else {
                println!("Not signed in");
            }
            Ok(())
        }

        cli::Command::Add { page, yes } => {
            let client = admin_client(&config)?;
            let script = ContentScript::new(extractor(&config), page_source(&page, fetch.clone())?)
                .with_images(Arc::new(HttpImageFetcher::new(fetch)));

            let mut state =
                PopupState::initialize(&client, Some(&script), config.extraction.message_timeout());
            println!("{}", state.render());

            if state.view == View::Login {
                bail!("Not signed in, run `wcap login` first");
            }
            if state.snapshot.is_none() {
                bail!("Nothing to save");
            }

            if !yes {
                match inquire::prompt_confirmation("Save to wardrobe?") {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            state.submit(&client);
            println!("{}", state.render());

            match state.notice {
                Some(notice) if notice.tone == Tone::Error => bail!(notice.text),
                _ => Ok(()),
            }
        }

        cli::Command::QuickAdd { url, link } => {
            let client = admin_client(&config)?;
            let trigger = background::Trigger::ContextMenu {
                link_url: link,
                page_url: Some(url),
                tab_url: None,
            };
            let Some(response) = background::handle_trigger(&client, &trigger) else {
                bail!("Nothing to save: empty url");
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.ok {
                bail!(response.error.unwrap_or_else(|| background::QUICK_ADD_FAILED.to_string()));
            }
            Ok(())
        }

        cli::Command::Daemon { listen, no_images } => {
            // keep a handle here so the blocking client is dropped outside the runtime
            let api: Arc<dyn AdminApi> = Arc::new(admin_client(&config)?);
            let state = web::SharedState {
                extractor: extractor(&config),
                api: api.clone(),
                fetch,
                message_timeout: config.extraction.message_timeout(),
                materialize_images: !no_images,
            };
            web::start_daemon(&listen, state)
        }
    }
}
