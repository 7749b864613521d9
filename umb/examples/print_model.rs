//! Print the transition structure of a UMB file

use clap::Parser;
use umb::{Entity, NumericType, UmbReader};

#[derive(Parser)]
#[command(author, version, about = "Print the states, actions and transitions of a UMB model file")]
struct Cli {
    /// UMB file to read
    #[arg(default_value = "example_model.umb")]
    file: String,

    /// Also print the state valuations
    #[arg(long)]
    valuations: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if !std::path::Path::new(&cli.file).exists() {
        println!("File '{}' not found!", cli.file);
        println!("   Run 'cargo run --example write_model' first");
        return Ok(());
    }

    let reader = UmbReader::open(&cli.file)?;
    let index = reader.index();

    let time = index.time()?;
    let branch_type = index.branch_probability_type()?;
    if branch_type != NumericType::Double {
        println!("Unexpected branch probability type: {branch_type}");
        std::process::exit(1);
    }
    println!(
        "Time: {time}, players: {}, states: {}, choices: {}, transitions: {}",
        index.num_players()?,
        index.num_states()?,
        index.num_choices()?,
        index.num_branches()?
    );

    let mut actions = Vec::new();
    if reader.has_choice_action_strings()? {
        reader.extract_choice_action_strings(|name| actions.push(name))?;
        println!("Actions: {actions:?}");
    }
    let mut choice_actions = Vec::new();
    if reader.has_choice_actions()? {
        reader.extract_choice_actions(|action| choice_actions.push(action))?;
    }

    let mut state_choices = Vec::new();
    reader.extract_state_choice_offsets(|offset| state_choices.push(offset as usize))?;
    let mut choice_branches = Vec::new();
    reader.extract_choice_branch_offsets(|offset| choice_branches.push(offset as usize))?;
    let mut targets = Vec::new();
    reader.extract_branch_targets(|target| targets.push(target))?;
    let mut probabilities = Vec::new();
    reader.extract_branch_probabilities(|p| probabilities.push(p))?;

    let mut initial = Vec::new();
    reader.extract_initial_states(|state| initial.push(state))?;
    println!("Initial states: {initial:?}");
    println!("Max choices per state: {}", reader.max_state_choice_count()?);

    for (state, choices) in state_choices.windows(2).enumerate() {
        for choice in choices[0]..choices[1] {
            let action = choice_actions
                .get(choice)
                .and_then(|&a| actions.get(a as usize))
                .map_or("?", String::as_str);
            print!("{state} -{action}->");
            for branch in choice_branches[choice]..choice_branches[choice + 1] {
                print!(" {}:{}", probabilities[branch], targets[branch]);
            }
            println!();
        }
    }

    for ap in index.aps() {
        let mut states = Vec::new();
        reader.extract_state_ap(ap.id(), |state| states.push(state))?;
        println!("AP {}: {states:?}", ap.name());
    }
    for rewards in index.rewards() {
        for entity in [Entity::States, Entity::Choices, Entity::Branches] {
            if rewards.applies_to(entity) {
                let mut values = Vec::new();
                reader.extract_rewards(rewards.id(), entity, |v| values.push(v))?;
                println!("Rewards {} ({entity}): {values:?}", rewards.name());
            }
        }
    }

    if cli.valuations && reader.has_state_valuations() {
        let layout = reader.state_valuation_layout()?;
        let mut state = 0;
        let mut failure = None;
        reader.extract_state_valuations(|record| {
            match layout.decode(&record) {
                Ok(values) => println!("{state}: ({values})  {}", record),
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
            state += 1;
        })?;
        if let Some(err) = failure {
            return Err(err.into());
        }
    }
    Ok(())
}
