use std::borrow::Cow;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::NOTEBOOK_EXTENSION;
use crate::common::placeholders::{
    DATA_FOLDER_PLACEHOLDER, DOCKER_IMAGE_PLACEHOLDER, INPUT_NOTEBOOK_PLACEHOLDER,
    INSTANCE_NAME_PLACEHOLDER, MODEL_BUCKET_PLACEHOLDER, MODEL_FOLDER_PLACEHOLDER,
    OUTPUT_NOTEBOOK_PLACEHOLDER, PARAMETERS_PLACEHOLDER, PlaceholderMap, ZONE_PLACEHOLDER,
    resolve,
};
use crate::runner::config::RunnerConfig;
use crate::runner::jobspec::JobSpec;

/// Length of the random part of generated instance names.
const INSTANCE_SUFFIX_LENGTH: usize = 8;

/// File name used when a notebook has no parameters.
const DEFAULT_OUTPUT_NAME: &str = "output";

/// Creates `-p <key> <value>` arguments of the notebook execution tool.
pub fn format_parameter_flags(params: &JobSpec) -> String {
    params
        .iter()
        .map(|(key, value)| format!("-p {} {}", shell_quote(key), shell_quote(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Creates a path of the output notebook: `<base_dir>/<key1>_<value1>_<key2>_<value2>.ipynb`.
pub fn format_output_path(base_dir: &Path, params: &JobSpec) -> PathBuf {
    let mut name = params
        .iter()
        .map(|(key, value)| format!("{key}_{value}"))
        .collect::<Vec<_>>()
        .join("_");
    if name.is_empty() {
        name.push_str(DEFAULT_OUTPUT_NAME);
    }
    base_dir.join(format!("{name}.{NOTEBOOK_EXTENSION}"))
}

/// Creates `<prefix>-<random lowercase suffix>`.
/// Collisions are not checked here, instance creation fails if the name is already taken.
pub fn generate_instance_name(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..INSTANCE_SUFFIX_LENGTH)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect();
    format!("{prefix}-{suffix}")
}

/// Fills the startup script template of `config` for a single notebook execution.
pub fn build_startup_script(config: &RunnerConfig, params: &JobSpec, instance_name: &str) -> String {
    let output_notebook = format_output_path(&config.output_notebook_dir, params);

    let mut placeholders = PlaceholderMap::new();
    placeholders.insert(DATA_FOLDER_PLACEHOLDER, quote_path(&config.data_folder));
    placeholders.insert(DOCKER_IMAGE_PLACEHOLDER, shell_quote(&config.docker_image));
    placeholders.insert(INPUT_NOTEBOOK_PLACEHOLDER, quote_path(&config.input_notebook));
    placeholders.insert(OUTPUT_NOTEBOOK_PLACEHOLDER, quote_path(&output_notebook));
    placeholders.insert(PARAMETERS_PLACEHOLDER, format_parameter_flags(params).into());
    placeholders.insert(MODEL_FOLDER_PLACEHOLDER, quote_path(&config.model_folder));
    placeholders.insert(MODEL_BUCKET_PLACEHOLDER, shell_quote(&config.model_bucket));
    placeholders.insert(INSTANCE_NAME_PLACEHOLDER, shell_quote(instance_name));
    placeholders.insert(ZONE_PLACEHOLDER, shell_quote(&config.zone));

    resolve(&placeholders, &config.startup_script_template)
}

fn quote_path(path: &Path) -> Cow<'static, str> {
    Cow::Owned(shell_quote(&path.to_string_lossy()).into_owned())
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ',' | '/' | ':' | '=' | '+' | '@')
}

/// Wraps `value` in single quotes if the remote shell would not see it as a single word.
pub fn shell_quote(value: &str) -> Cow<'_, str> {
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("'{}'", value.replace('\'', r"'\''")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;

    use super::{
        build_startup_script, format_output_path, format_parameter_flags, generate_instance_name,
        shell_quote,
    };
    use crate::runner::jobspec::JobSpec;
    use crate::tests::utils::{RunnerBuilder, job};

    /// Splits `-p <key> <value>` flags back into parameters.
    fn parse_flags(flags: &str) -> JobSpec {
        let tokens: Vec<&str> = flags.split(' ').collect();
        assert_eq!(tokens.len() % 3, 0);
        tokens
            .chunks(3)
            .map(|chunk| {
                assert_eq!(chunk[0], "-p");
                (chunk[1], chunk[2])
            })
            .collect()
    }

    #[test]
    fn flags_for_each_parameter() {
        let params = job(&[("epochs", "10"), ("lr", "0.01"), ("model", "resnet50")]);
        let flags = format_parameter_flags(&params);
        assert_eq!(flags, "-p epochs 10 -p lr 0.01 -p model resnet50");
        assert_eq!(flags.matches("-p ").count(), params.len());
        assert_eq!(parse_flags(&flags), params);
    }

    #[test]
    fn flags_keep_insertion_order() {
        let first = job(&[("a", "1"), ("b", "2")]);
        let second = job(&[("b", "2"), ("a", "1")]);
        assert_eq!(format_parameter_flags(&first), "-p a 1 -p b 2");
        assert_eq!(format_parameter_flags(&second), "-p b 2 -p a 1");
    }

    #[test]
    fn flags_empty() {
        assert_eq!(format_parameter_flags(&JobSpec::new()), "");
    }

    #[test]
    fn flags_quote_unsafe_values() {
        let params = job(&[("name", "my model"), ("quote", "it's")]);
        assert_eq!(
            format_parameter_flags(&params),
            r"-p name 'my model' -p quote 'it'\''s'"
        );
    }

    #[test]
    fn shell_quote_empty_value() {
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn output_path_from_parameters() {
        let params = job(&[("epochs", "10"), ("lr", "0.01")]);
        let path = format_output_path(Path::new("/data/output"), &params);
        assert_eq!(path, Path::new("/data/output/epochs_10_lr_0.01.ipynb"));
    }

    #[test]
    fn output_path_has_no_trailing_separator() {
        for params in [
            job(&[("a", "1")]),
            job(&[("a", "1"), ("b", "2"), ("c", "3")]),
            job(&[("x", "y_")]),
        ] {
            let path = format_output_path(Path::new("out"), &params);
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(name.ends_with(".ipynb"));
            let stem = name.strip_suffix(".ipynb").unwrap();
            assert!(!stem.ends_with("__"), "{stem}");
            assert_ne!(stem, "");
        }
    }

    #[test]
    fn output_path_depends_on_order() {
        let first = format_output_path(Path::new("out"), &job(&[("a", "1"), ("b", "2")]));
        let second = format_output_path(Path::new("out"), &job(&[("b", "2"), ("a", "1")]));
        assert_ne!(first, second);
    }

    #[test]
    fn output_path_without_parameters() {
        assert_eq!(
            format_output_path(Path::new("out"), &JobSpec::new()),
            Path::new("out/output.ipynb")
        );
    }

    #[test]
    fn instance_name_format() {
        let name = generate_instance_name("my-project");
        let suffix = name.strip_prefix("my-project-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn instance_names_are_unique() {
        let names: HashSet<String> = (0..10_000)
            .map(|_| generate_instance_name("p"))
            .collect();
        assert_eq!(names.len(), 10_000);
    }

    #[test]
    fn startup_script_contains_invocation() {
        let config = RunnerBuilder::default()
            .data_folder("/data")
            .docker_image("img:latest")
            .zone("us-west1-b")
            .build();
        let script = build_startup_script(&config, &job(&[("epochs", "10")]), "proj-abcdefgh");

        assert!(script.contains("-p epochs 10"));
        assert!(script.contains("-v /data:/data img:latest papermill"));
        let last_line = script.lines().last().unwrap();
        assert_eq!(
            last_line,
            "sudo gcloud --quiet compute instances delete proj-abcdefgh --zone us-west1-b"
        );
    }

    #[test]
    fn startup_script_full() {
        let config = RunnerBuilder::default()
            .data_folder("/data")
            .docker_image("vanvalenlab/deepcell:latest")
            .input_notebook("/data/notebooks/train.ipynb")
            .output_notebook_dir("/data/output")
            .model_folder("/data/models")
            .model_bucket("gs://models/run-1")
            .zone("us-west1-a")
            .build();
        let script = build_startup_script(
            &config,
            &job(&[("epochs", "10"), ("lr", "0.01")]),
            "proj-qwertyui",
        );
        insta::assert_snapshot!(script, @r"
        #!/bin/bash
        sudo docker run --gpus all -v /data:/data vanvalenlab/deepcell:latest papermill /data/notebooks/train.ipynb /data/output/epochs_10_lr_0.01.ipynb -p epochs 10 -p lr 0.01
        gsutil cp -r /data/models/* gs://models/run-1
        sudo gcloud --quiet compute instances delete proj-qwertyui --zone us-west1-a
        ");
    }

    #[test]
    fn startup_script_custom_template() {
        let config = RunnerBuilder::default()
            .startup_script_template("run %{INPUT_NOTEBOOK} on %{INSTANCE_NAME}")
            .input_notebook("/nb/in.ipynb")
            .build();
        let script = build_startup_script(&config, &JobSpec::new(), "a-b");
        assert_eq!(script, "run /nb/in.ipynb on a-b");
    }
}
