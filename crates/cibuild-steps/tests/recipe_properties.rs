use cibuild_api::{BundleSourceStepConfiguration, ExecutionMode};
use cibuild_steps::steps::BundleSourceStep;
use cibuild_steps::{Instruction, Recipe, ShellCommand};
use cibuild_test_utils::{test_environment, FakeCluster};
use proptest::prelude::*;

fn pull_spec() -> impl Strategy<Value = String> {
    "[a-z0-9.-]{1,12}/[a-z0-9-]{1,12}:[a-z0-9.]{1,8}"
}

fn symbolic_tag() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}"
}

fn render_simulated(config: BundleSourceStepConfiguration) -> Recipe {
    let step = BundleSourceStep::new(config, &FakeCluster::healthy().clients(), &test_environment());
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    rt.block_on(step.recipe(ExecutionMode::Simulated))
        .expect("simulated recipe")
}

proptest! {
    #[test]
    fn prop_one_instruction_per_substitution_in_order(
        subs in proptest::collection::vec((pull_spec(), symbolic_tag()), 0..12)
    ) {
        let mut config = BundleSourceStepConfiguration::new("ci-bundle0", "bundle", "manifests");
        for (spec, tag) in &subs {
            config = config.with_substitution(spec.clone(), tag.clone());
        }

        let recipe = render_simulated(config);

        prop_assert_eq!(recipe.len(), subs.len() + 1);
        prop_assert_eq!(&recipe.instructions()[0], &Instruction::From("pipeline:src".to_string()));
        for (instruction, (spec, tag)) in recipe.instructions()[1..].iter().zip(&subs) {
            match instruction {
                Instruction::Run(command) => {
                    prop_assert_eq!(command.search(), spec.as_str());
                    let expected_suffix = format!(":{tag}");
                    prop_assert!(command.replacement().ends_with(&expected_suffix));
                    prop_assert_eq!(command.manifest_dir(), "bundle/manifests");
                }
                Instruction::From(_) => prop_assert!(false, "only the first instruction is FROM"),
            }
        }
    }

    #[test]
    fn prop_rendering_is_deterministic(
        subs in proptest::collection::vec((pull_spec(), symbolic_tag()), 0..8)
    ) {
        let mut config = BundleSourceStepConfiguration::new("ci-bundle0", "", "manifests");
        for (spec, tag) in &subs {
            config = config.with_substitution(spec.clone(), tag.clone());
        }

        let first = render_simulated(config.clone()).text();
        let second = render_simulated(config).text();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.starts_with("\nFROM pipeline:src\n"));
        prop_assert!(first.ends_with('\n'));
        prop_assert_eq!(first.lines().filter(|l| l.starts_with("RUN ")).count(), subs.len());
    }

    #[test]
    fn prop_reserved_characters_are_rejected(
        prefix in "[a-z]{0,6}",
        reserved in prop::sample::select(vec!['?', '\'', '"', '\\']),
        suffix in "[a-z]{0,6}",
    ) {
        let value = format!("{prefix}{reserved}{suffix}");
        prop_assert!(ShellCommand::replace("manifests", value.clone(), "ok").is_err());
        prop_assert!(ShellCommand::replace("manifests", "ok", value).is_err());
    }
}
