use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;

use opsdash::config::Config;
use opsdash::dashboard::types::{MonthYear, OptionKind};
use opsdash::dashboard::Dashboard;
use opsdash::event::{self, Event, EventReceiver, NotificationLevel};
use opsdash::query::{Optimistic, Query, QueryState, ToggleOutcome};
use opsdash::reorder::{sorted_by_order, MoveDirection};
use opsdash::session::{MemorySessionStore, SessionStore, SqliteSessionStore};

use crate::wizard;

#[derive(Parser, Debug)]
#[command(name = "opsdash")]
#[command(about = "Command-line client for the operations dashboard")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/opsdash/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// Keep the session in memory instead of the local database
  #[arg(long, global = true)]
  pub no_persist: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Store a bearer token for later commands
  Login {
    #[arg(long)]
    token: String,
  },
  /// Forget the stored token
  Logout,
  /// List inventory items, categories or stores
  Inventory {
    #[command(subcommand)]
    what: InventoryCommand,
  },
  /// List technicians, or show one
  Technicians {
    #[arg(long)]
    id: Option<String>,
  },
  /// A technician's purchases in one month
  Purchases {
    #[arg(long)]
    technician: String,
    #[arg(long)]
    month: u32,
    #[arg(long)]
    year: i32,
  },
  /// Flip the delivered flag of a purchase
  PurchaseDelivered {
    #[arg(long)]
    technician: String,
    #[arg(long)]
    id: String,
    /// Current value of the flag
    #[arg(long)]
    delivered: bool,
  },
  /// Inventory notes for a team member or a month
  Notes {
    #[arg(long, conflicts_with_all = ["month", "year"])]
    member: Option<String>,
    #[arg(long)]
    month: Option<u32>,
    #[arg(long)]
    year: Option<i32>,
  },
  /// KPI entries of a team member in one month
  Kpi {
    #[arg(long)]
    member: String,
    #[arg(long)]
    month: u32,
    #[arg(long)]
    year: i32,
  },
  /// Custom KPI metrics
  Metrics,
  /// Team member types or statuses
  TeamOptions {
    #[arg(long, value_enum)]
    kind: KindArg,
  },
  /// Column layout of a table
  Columns {
    #[arg(long)]
    table: String,
  },
  /// Move an inventory category one position
  MoveCategory {
    #[arg(long)]
    index: usize,
    #[arg(long, conflicts_with = "down", required_unless_present = "down")]
    up: bool,
    #[arg(long)]
    down: bool,
  },
  /// Show account settings
  Settings,
  /// Connection status of a third-party integration
  Integration {
    #[arg(long)]
    provider: String,
  },
  /// Fill in the public inventory request form
  Form {
    /// Access key (default: public_form.access_key or OPSDASH_FORM_KEY)
    #[arg(long)]
    key: Option<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum InventoryCommand {
  Items {
    #[arg(long)]
    category: Option<String>,
  },
  Categories,
  Stores,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
  Type,
  Status,
}

impl From<KindArg> for OptionKind {
  fn from(kind: KindArg) -> Self {
    match kind {
      KindArg::Type => OptionKind::Type,
      KindArg::Status => OptionKind::Status,
    }
  }
}

pub async fn run(args: Args) -> Result<()> {
  let config = Config::load(args.config.as_deref())?;

  let session: Arc<dyn SessionStore> = if args.no_persist {
    Arc::new(MemorySessionStore::new())
  } else {
    Arc::new(SqliteSessionStore::open()?)
  };

  let (notifier, mut events) = event::channel();
  let dash = Dashboard::from_config(&config, session.clone(), notifier)?;

  let outcome = execute(args.command, &config, &dash, session.as_ref()).await;
  print_events(&mut events);
  outcome
}

async fn execute(
  command: Command,
  config: &Config,
  dash: &Dashboard,
  session: &dyn SessionStore,
) -> Result<()> {
  match command {
    Command::Login { token } => {
      session.set_token(token.trim())?;
      println!("Signed in");
    }
    Command::Logout => {
      session.clear()?;
      dash.cache().clear();
      println!("Signed out");
    }
    Command::Inventory { what } => match what {
      InventoryCommand::Items { category } => {
        show(dash.inventory().items(category.as_deref()), |items| {
          for item in items {
            println!(
              "{:<24} {:<32} qty {:>5} ideal {:>5}",
              item.id,
              item.name,
              item.quantity,
              display_opt(item.ideal_quantity)
            );
          }
        })
        .await?
      }
      InventoryCommand::Categories => {
        show(dash.inventory().categories(), |categories| {
          // Positions match what move-category takes
          for (i, c) in sorted_by_order(categories).iter().enumerate() {
            println!("{:>3}. {:<24} {:<32} {:?}", i, c.id, c.name, c.kind);
          }
        })
        .await?
      }
      InventoryCommand::Stores => {
        show(dash.inventory().stores(), |stores| {
          for s in stores {
            println!("{:<24} {:<32} {}", s.id, s.name, s.website.as_deref().unwrap_or(""));
          }
        })
        .await?
      }
    },
    Command::Technicians { id: Some(id) } => {
      show(dash.technicians().get(&id), |t| {
        println!("{} ({})", t.name, t.id);
        println!("  email: {}", t.email.as_deref().unwrap_or("-"));
        println!("  phone: {}", t.phone.as_deref().unwrap_or("-"));
        println!("  active: {}", t.is_active);
      })
      .await?
    }
    Command::Technicians { id: None } => {
      show(dash.technicians().list(), |technicians| {
        for t in technicians {
          println!("{:<24} {}", t.id, t.name);
        }
      })
      .await?
    }
    Command::Purchases {
      technician,
      month,
      year,
    } => {
      let period = month_year(Some(month), Some(year))?;
      show(
        dash.technicians().purchases(Some(&technician), Some(period)),
        |purchases| {
          for p in purchases {
            println!(
              "{:<24} {:<32} x{:<4} {:>10} {}",
              p.id,
              p.item_name,
              p.quantity,
              p.total_cost().map(|c| format!("${:.2}", c)).unwrap_or_default(),
              if p.delivered { "delivered" } else { "pending" }
            );
          }
        },
      )
      .await?
    }
    Command::PurchaseDelivered {
      technician,
      id,
      delivered,
    } => {
      let mut flag = Optimistic::new(delivered);
      flag.toggle(dash.technicians().set_delivered(&technician, &id));
      println!("delivered: {} (saving)", flag.value());
      match flag.settle().await {
        Some(ToggleOutcome::Committed(value)) => println!("delivered: {}", value),
        Some(ToggleOutcome::RolledBack { value, .. }) => {
          println!("delivered: {} (reverted)", value)
        }
        None => {}
      }
    }
    Command::Notes {
      member,
      month,
      year,
    } => {
      let query = match member {
        Some(member) => dash.notes().for_member(Some(&member)),
        None => dash.notes().for_month(Some(month_year(month, year)?)),
      };
      show(query, |notes| {
        for n in notes {
          println!("{:<24} {}", n.id, n.content);
        }
      })
      .await?
    }
    Command::Kpi {
      member,
      month,
      year,
    } => {
      let period = month_year(Some(month), Some(year))?;
      show(dash.kpi().entries(Some(&member), Some(period)), |entries| {
        for entry in entries {
          let period = MonthYear::new(entry.month, entry.year)
            .map(|p| p.to_string())
            .unwrap_or_default();
          println!("{} {}", entry.id, period);
          for (metric, value) in &entry.values {
            println!("  {:<24} {}", metric, value);
          }
        }
      })
      .await?
    }
    Command::Metrics => {
      show(dash.kpi().metrics(), |metrics| {
        for m in metrics {
          println!("{:<24} {:<32} {:?}", m.id, m.name, m.kind);
        }
      })
      .await?
    }
    Command::TeamOptions { kind } => {
      show(dash.team().list(kind.into()), |options| {
        for o in options {
          println!("{:<24} {:<24} {}", o.id, o.name, o.color.as_deref().unwrap_or(""));
        }
      })
      .await?
    }
    Command::Columns { table } => {
      show(dash.columns().list(&table), |columns| {
        for c in columns {
          println!(
            "{:<24} {:<24} {}",
            c.key,
            c.label,
            if c.is_visible { "shown" } else { "hidden" }
          );
        }
      })
      .await?
    }
    Command::MoveCategory { index, up, .. } => {
      let direction = if up {
        MoveDirection::Up
      } else {
        MoveDirection::Down
      };
      let mut query = dash.inventory().categories();
      let categories = sorted_by_order(&loaded(&mut query).await?);
      dash
        .inventory()
        .move_category(&categories, index, direction)
        .await?;
    }
    Command::Settings => {
      show(dash.settings().default_ideal_inventory(), |setting| {
        println!("Default ideal inventory: {}", setting.value);
      })
      .await?;
      show(dash.settings().message_templates(), |templates| {
        for t in templates {
          println!("[{}]\n{}\n", t.kind, t.body);
        }
      })
      .await?
    }
    Command::Integration { provider } => {
      show(dash.integrations().status(&provider), |status| {
        println!("{}: {:?}", provider, status);
      })
      .await?
    }
    Command::Form { key } => {
      let key = key
        .or_else(|| config.public_form.as_ref().map(|f| f.access_key.clone()))
        .ok_or_else(|| eyre!("No form access key. Pass --key or set OPSDASH_FORM_KEY"))?;
      wizard::run(dash.client(), &key).await?;
    }
  }

  Ok(())
}

/// Load a query and hand its data to `render`.
async fn show<T, F>(mut query: Query<T>, render: F) -> Result<()>
where
  T: Clone + Send + Sync + 'static,
  F: FnOnce(&T),
{
  let data = loaded(&mut query).await?;
  render(&data);
  Ok(())
}

async fn loaded<T>(query: &mut Query<T>) -> Result<T>
where
  T: Clone + Send + Sync + 'static,
{
  let state = query.load().await.clone();
  match state {
    QueryState::Success(data) => Ok(data),
    QueryState::Error(message) => Err(eyre!("{}", message)),
    QueryState::Disabled => Err(eyre!("Missing parameters for {}", query.key())),
    QueryState::Idle | QueryState::Loading => Err(eyre!("Query for {} did not finish", query.key())),
  }
}

fn month_year(month: Option<u32>, year: Option<i32>) -> Result<MonthYear> {
  match (month, year) {
    (Some(m), Some(y)) => MonthYear::new(m, y).ok_or_else(|| eyre!("Month must be 1-12, got {}", m)),
    _ => Err(eyre!("Both --month and --year are required")),
  }
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
  value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_events(events: &mut EventReceiver) {
  for event in events.drain() {
    match event {
      Event::Notification(n) => match n.level {
        NotificationLevel::Success => println!("✓ {}", n.message),
        NotificationLevel::Error => eprintln!("✗ {}", n.message),
      },
      Event::SignInRequired => {
        eprintln!("Session expired. Run `opsdash login --token <TOKEN>` to sign in again.")
      }
    }
  }
}
