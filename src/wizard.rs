//! Interactive walk through the public inventory request form.

use color_eyre::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use opsdash::api::ApiClient;
use opsdash::public_form::{fetch_form, FormError, PublicForm, Stage, MIN_MATCH_LEN};

pub async fn run(client: &ApiClient, access_key: &str) -> Result<()> {
  let data = fetch_form(client, access_key).await?;
  let mut form = PublicForm::new(data);
  let theme = ColorfulTheme::default();

  loop {
    if let Some(n) = form.stage_number() {
      println!("\nStep {} of {}", n, form.stage_count());
    }

    match form.stage() {
      Stage::Name => name_stage(&mut form, &theme)?,
      Stage::Category(_) => category_stage(&mut form, &theme)?,
      Stage::Notes => {
        let notes: String = Input::with_theme(&theme)
          .with_prompt("Notes (optional)")
          .with_initial_text(form.notes())
          .allow_empty(true)
          .interact_text()?;
        form.set_notes(&notes);

        match choose(&theme, &["Submit", "Back"])? {
          0 => match form.submit(client, access_key).await {
            Ok(()) => {}
            Err(err) => println!("Could not submit: {}", err),
          },
          _ => {
            form.back();
          }
        }
      }
      Stage::Submitted => {
        println!("Your request was sent.");
        let again = Confirm::with_theme(&theme)
          .with_prompt("Submit another request?")
          .default(false)
          .interact()?;
        if !again {
          return Ok(());
        }
        form.submit_another();
      }
    }
  }
}

fn name_stage(form: &mut PublicForm, theme: &ColorfulTheme) -> Result<()> {
  let name: String = Input::with_theme(theme)
    .with_prompt("Your name")
    .with_initial_text(form.name())
    .allow_empty(true)
    .interact_text()?;
  form.set_name(&name);

  let candidates: Vec<(String, String)> = form
    .candidates()
    .into_iter()
    .map(|t| (t.id.clone(), t.name.clone()))
    .collect();

  if !candidates.is_empty() {
    let names: Vec<&str> = candidates.iter().map(|(_, name)| name.as_str()).collect();
    let picked = Select::with_theme(theme)
      .with_prompt("Select your name")
      .items(&names)
      .default(0)
      .interact()?;
    form.select_technician(&candidates[picked].0);
  }

  advance(form);
  Ok(())
}

fn category_stage(form: &mut PublicForm, theme: &ColorfulTheme) -> Result<()> {
  let Some(stage) = form.current_category().cloned() else {
    return Ok(());
  };
  println!("{}", stage.category.name);

  for field in &stage.fields {
    let mut prompt = field.name.clone();
    if field.is_required {
      prompt.push_str(" *");
    }
    if let Some(max) = field.max_quantity {
      prompt.push_str(&format!(" (max {})", max));
    }
    let quantity: u32 = Input::with_theme(theme)
      .with_prompt(prompt)
      .default(form.quantity(&field.id))
      .interact_text()?;
    form.set_quantity(&field.id, quantity);
  }

  match choose(theme, &["Next", "Back"])? {
    0 => advance(form),
    _ => {
      form.back();
    }
  }
  Ok(())
}

fn advance(form: &mut PublicForm) {
  match form.next() {
    Ok(_) => {}
    Err(FormError::TechnicianNotSelected) if form.name().trim().chars().count() < MIN_MATCH_LEN => {
      println!("Type at least 4 letters of your name to find it in the list")
    }
    Err(err) => println!("{}", err),
  }
}

fn choose(theme: &ColorfulTheme, options: &[&str]) -> Result<usize> {
  Ok(
    Select::with_theme(theme)
      .items(options)
      .default(0)
      .interact()?,
  )
}
