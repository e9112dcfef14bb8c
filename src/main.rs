use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use connsync::{
    app::App,
    cipher::CommandCipher,
    client::CipherClient,
    grammar,
    manager::DescriptorManager,
    model::{
        buffer::FieldChange,
        descriptor::{AuthMode, ConnectionDescriptor, DescriptorId, Selection},
    },
    session::EditSession,
    system::{command::Command, event::Event},
    utils::storage::{get_app_data_path, FileStorage, Storage},
};
use std::{path::PathBuf, rc::Rc, sync::Arc};

/// Manage SQL Server connections and keep their connection strings in sync.
#[derive(Parser)]
#[command(author, version)]
pub struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// List stored connections
    List,

    /// Show a stored connection
    Show { id: DescriptorId },

    /// Decode a connection string without storing anything
    Parse { connection_string: String },

    /// Store a new connection
    Add {
        #[clap(flatten)]
        fields: FieldArgs,
    },

    /// Change a stored connection
    Edit {
        id: DescriptorId,

        #[clap(flatten)]
        fields: FieldArgs,
    },

    /// Remove a stored connection
    Delete { id: DescriptorId },
}

#[derive(Debug, clap::Args)]
struct FieldArgs {
    /// Full connection string; applied before the other fields
    #[arg(long, short = 'c')]
    connection_string: Option<String>,

    #[arg(long, short)]
    name: Option<String>,

    #[arg(long, short)]
    server: Option<String>,

    /// One of `sql`, `windows` or `azuread`
    #[arg(long, short)]
    auth: Option<AuthMode>,

    #[arg(long, short)]
    username: Option<String>,

    #[arg(long, short)]
    password: Option<String>,

    #[arg(long, short)]
    database: Option<String>,

    /// Connect timeout in seconds; pass an empty value to clear it
    #[arg(long, short)]
    timeout: Option<String>,

    /// Ask before running statements against this connection
    #[arg(long)]
    confirm: Option<bool>,
}

impl FieldArgs {
    fn into_changes(self) -> Vec<FieldChange> {
        [
            self.connection_string.map(FieldChange::ConnectionString),
            self.name.map(FieldChange::Name),
            self.server.map(FieldChange::Server),
            self.auth.map(FieldChange::AuthMode),
            self.username.map(FieldChange::Username),
            self.password.map(FieldChange::Password),
            self.database.map(FieldChange::Database),
            self.timeout.map(FieldChange::Timeout),
            self.confirm.map(FieldChange::ConfirmBeforeExecute),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    tracing::info!(
        "Started {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );

    let args = Args::parse();

    let storage = FileStorage::init()?;
    let config = storage.read_config().unwrap_or_default();
    let storage: Rc<dyn Storage> = Rc::new(storage);
    let manager = DescriptorManager::load(storage).context("Loading stored connections")?;

    match args.command {
        Cmd::List => {
            for descriptor in manager.descriptors() {
                println!(
                    "{}  {:<24} {:<24} {}",
                    descriptor.id(),
                    descriptor.name,
                    descriptor.server,
                    descriptor.auth_mode()
                );
            }
        }
        Cmd::Show { id } => {
            let descriptor = manager
                .find(&id)
                .with_context(|| format!("No stored connection with id {id}"))?;
            print_descriptor(&descriptor);
        }
        Cmd::Parse { connection_string } => {
            let map = grammar::parse(&connection_string)?;
            if map.is_empty() {
                println!("(no entries)");
            } else {
                println!("{} entries:", map.len());
                for (key, value) in map.iter() {
                    println!("  {key} = {value}");
                }
            }
            println!("auth mode: {}", map.auth_mode());
        }
        Cmd::Add { fields } => {
            let mut app = new_app(manager, CommandCipher::from_config(&config.cipher));
            edit(&mut app, Selection::New, fields.into_changes()).await?;
        }
        Cmd::Edit { id, fields } => {
            let mut app = new_app(manager, CommandCipher::from_config(&config.cipher));
            edit(&mut app, Selection::Existing(id), fields.into_changes()).await?;
        }
        // no form to fill, so no session and no decrypt of the stored password
        Cmd::Delete { id } => {
            if let Some(id) = manager.delete(&Selection::Existing(id))? {
                println!("Deleted {id}");
            }
        }
    }

    Ok(())
}

fn new_app(manager: DescriptorManager, cipher: CommandCipher) -> App {
    App::new(
        EditSession::new(manager),
        CipherClient::new(Arc::new(cipher)),
    )
}

#[tracing::instrument(skip(app, changes))]
async fn edit(app: &mut App, selection: Selection, changes: Vec<FieldChange>) -> Result<()> {
    app.dispatch_event(Event::SessionOpened(selection));
    // the stored password has to be back before fields are touched
    app.settle().await;
    report(&app.take_events())?;

    for change in changes {
        app.dispatch_event(Event::FieldChanged(change));
    }
    app.dispatch_command(Command::Save);
    app.settle().await;

    report(&app.take_events())
}

/// Prints what the session did and turns its failures into an error.
fn report(events: &[Event]) -> Result<()> {
    for event in events {
        match event {
            Event::DescriptorCommitted(descriptor) => {
                println!("Saved {} ({})", descriptor.name, descriptor.id());
            }
            Event::DescriptorDeleted(id) => println!("Deleted {id}"),
            Event::ValidationFailed(report) => bail!("Not saved: {report}"),
            Event::ErrorOccurred(error) => bail!("{error}"),
            _ => (),
        }
    }
    Ok(())
}

fn print_descriptor(descriptor: &ConnectionDescriptor) {
    println!("id:        {}", descriptor.id());
    println!("name:      {}", descriptor.name);
    println!("server:    {}", descriptor.server);
    println!("auth:      {}", descriptor.auth_mode());
    println!("username:  {}", descriptor.username);
    println!(
        "password:  {}",
        if descriptor.password.is_empty() {
            "(none)"
        } else {
            "(stored)"
        }
    );
    println!("database:  {}", descriptor.database);
    if let Some(timeout) = descriptor.timeout_seconds {
        println!("timeout:   {timeout}s");
    }
    println!("confirm:   {}", descriptor.confirm_before_execute);
    println!("string:    {}", descriptor.raw_string);
}

/// Initializes the `tracing` system for logging.
fn init_tracing() -> Result<()> {
    let log_env = format!("{}_LOGLEVEL", env!("CARGO_PKG_NAME").to_uppercase());
    let log_filename = format!("{}.log", env!("CARGO_PKG_NAME"));

    let log_file_path = get_app_data_path().map_or_else(
        |_| PathBuf::from(".").join(&log_filename),
        |dir| dir.join(&log_filename),
    );

    let log_file = std::fs::File::create(log_file_path)?;

    // set up the logging level env var
    std::env::set_var(
        "RUST_LOG",
        std::env::var("RUST_LOG")
            .or_else(|_| std::env::var(log_env))
            .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME"))),
    );

    let subscriber = tracing_subscriber::fmt()
        .with_line_number(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(log_file)
        .pretty()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
