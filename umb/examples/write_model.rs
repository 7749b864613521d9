//! Write a small MDP with actions, rewards, labels and state valuations

use std::time::Instant;
use umb::{
    BitString, ExportConfig, Layout, NumericType, TimeNotion, UmbWriter, VariableType,
    VariableValue,
};

fn main() -> umb::Result<()> {
    let filename = "example_model.umb";
    println!("Writing demo MDP to '{filename}'...");

    // A walk on 0..=3: in every state but the last, "stay" loops and "step"
    // moves right with probability 0.9 or stays with 0.1
    let num_states = 4u64;
    let mut state_choices = vec![0u64];
    let mut choice_branches = vec![0u64];
    let mut targets = Vec::new();
    let mut probabilities = Vec::new();
    let mut actions = Vec::new();
    for state in 0..num_states {
        // stay
        targets.push(state);
        probabilities.push(1.0);
        actions.push(0u32);
        choice_branches.push(targets.len() as u64);
        if state + 1 < num_states {
            // step
            targets.extend([state + 1, state]);
            probabilities.extend([0.9, 0.1]);
            actions.push(1);
            choice_branches.push(targets.len() as u64);
        }
        state_choices.push(actions.len() as u64);
    }
    let num_choices = actions.len() as u64;
    let num_branches = targets.len() as u64;
    println!("States: {num_states}, choices: {num_choices}, branches: {num_branches}");

    let mut writer = UmbWriter::new();
    writer
        .index_mut()
        .set_time(TimeNotion::Discrete)
        .set_num_players(1)
        .set_num_states(num_states)
        .set_num_initial_states(1)
        .set_num_choices(num_choices)
        .set_num_branches(num_branches)
        .set_num_branch_actions(0)
        .set_branch_probability_type(NumericType::Double);
    writer.index_mut().model_data_mut().name = Some("walk".to_string());

    writer.add_state_choice_offsets(state_choices)?;
    writer.add_choice_branch_offsets(choice_branches)?;
    writer.add_branch_targets(targets)?;
    writer.add_branch_probabilities(probabilities)?;
    writer.add_initial_state_indices([0])?;
    writer.add_choice_actions(actions.clone())?;
    writer.add_choice_action_strings(["stay", "step"])?;

    writer.add_state_ap("goal", (0..num_states).map(move |s| s == num_states - 1))?;
    let steps = writer.add_rewards(Some("steps"))?;
    writer.add_reward_data(
        &steps,
        umb::Entity::Choices,
        actions.into_iter().map(f64::from),
    )?;
    writer.add_int_variable("x", (0..num_states as i32).collect::<Vec<_>>())?;

    let mut layout = Layout::new();
    layout
        .add_variable("x", 2, VariableType::Uint)
        .add_variable("done", 1, VariableType::Bool)
        .pad_to_byte_boundary();
    let mut records: Vec<BitString> = Vec::new();
    for state in 0..num_states {
        let mut record = layout.new_bit_string();
        layout.set(&mut record, 0, VariableValue::Uint(state as u32))?;
        layout.set(&mut record, 1, VariableValue::Bool(state + 1 == num_states))?;
        records.push(record);
    }
    writer.add_state_valuations(&layout, records)?;

    let start = Instant::now();
    writer.export_with(filename, &ExportConfig::default())?;
    println!("Model written in {:?}", start.elapsed());
    println!("\nRun 'cargo run --example print_model -- {filename}' to read it back!");
    Ok(())
}
