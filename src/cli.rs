use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Capture product pages into the wardrobe library", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PageArgs {
    /// Product page url
    pub url: String,

    /// Read the page from a saved HTML file instead of fetching it
    #[clap(long)]
    pub html: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract a product snapshot and print it as JSON
    Scan {
        #[command(flatten)]
        page: PageArgs,

        /// Don't download and inline images
        #[clap(long, default_value = "false")]
        no_images: bool,

        /// Print which source won each field
        #[clap(long, default_value = "false")]
        report: bool,
    },

    /// Sign in to the admin API
    Login {
        #[clap(short, long)]
        email: String,

        /// Prompted for when omitted
        #[clap(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout {},

    /// Check whether the stored session is still accepted
    Whoami {},

    /// Preview a product and save it to the library
    Add {
        #[command(flatten)]
        page: PageArgs,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Send only the url; the server does the scraping
    QuickAdd {
        /// Page url
        url: String,

        /// A link on that page to save instead of the page itself
        #[clap(long)]
        link: Option<String>,
    },

    /// Serve the message endpoint for a browser shim
    Daemon {
        #[clap(long, default_value = "127.0.0.1:8080")]
        listen: String,

        /// Don't inline images into extraction replies
        #[clap(long, default_value = "false")]
        no_images: bool,
    },
}
