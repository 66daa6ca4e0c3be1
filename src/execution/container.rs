//! Docker API wrapper using the bollard crate.
//!
//! The formatting stage of the stock pipeline delegates to an external image.
//! This wrapper covers exactly that lifecycle: ensure the image is present,
//! create a container with the job's environment, start it, wait for it to
//! exit, collect its logs, and remove it.

use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;

use crate::error::DockerError;

/// Configuration for a one-shot container job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Container name.
    pub name: String,
    /// Image to run.
    pub image: String,
    /// Environment variables (KEY=value format).
    pub env: Vec<String>,
    /// Network mode (e.g. "bridge", "container:spark-master").
    pub network_mode: Option<String>,
    /// Remove the container after it exits.
    pub auto_remove: bool,
}

impl JobConfig {
    /// Creates a job configuration for the given name and image.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            env: Vec::new(),
            network_mode: None,
            auto_remove: true,
        }
    }

    /// Adds an environment variable.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push(format!("{key}={value}"));
        self
    }

    /// Sets the network mode.
    pub fn with_network_mode(mut self, mode: impl Into<String>) -> Self {
        self.network_mode = Some(mode.into());
        self
    }

    /// Keeps the container around after it exits.
    pub fn keep_container(mut self) -> Self {
        self.auto_remove = false;
        self
    }
}

/// Result of a finished container job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    /// Container exit code.
    pub exit_code: i64,
    /// Combined stdout and stderr.
    pub logs: String,
}

/// Docker client wrapper for one-shot jobs.
pub struct ContainerRunner {
    docker: Docker,
}

impl ContainerRunner {
    /// Connects to the Docker daemon.
    ///
    /// With a URL, connects over HTTP (e.g. "tcp://docker-proxy:2375");
    /// otherwise uses the platform's local defaults.
    ///
    /// # Errors
    ///
    /// Returns `DockerError::DaemonUnavailable` if the daemon is not
    /// accessible.
    pub fn connect(docker_url: Option<&str>) -> Result<Self, DockerError> {
        let docker = match docker_url {
            Some(url) => Docker::connect_with_http(url, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| DockerError::DaemonUnavailable(format!("Failed to connect to {url}: {e}")))?,
            None => Docker::connect_with_local_defaults()
                .map_err(|e| DockerError::DaemonUnavailable(format!("Failed to connect: {e}")))?,
        };

        Ok(Self { docker })
    }

    /// Creates a runner from an existing bollard Docker instance.
    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }

    /// Pulls the image if it is not present locally.
    pub async fn ensure_image(&self, image: &str) -> Result<(), DockerError> {
        if self.docker.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        tracing::info!(image, "pulling image");
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| DockerError::PullFailed {
                image: image.to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Runs a job to completion and returns its output.
    ///
    /// The container is always removed afterwards when `auto_remove` is set,
    /// including on failure paths where it was created.
    ///
    /// # Errors
    ///
    /// Returns `DockerError::NonZeroExit` when the container exits with a
    /// non-zero code; the error carries the collected logs.
    pub async fn run_to_completion(&self, config: JobConfig) -> Result<JobOutput, DockerError> {
        self.ensure_image(&config.image).await?;

        let host_config = HostConfig {
            network_mode: config.network_mode.clone(),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(config.image.clone()),
            env: if config.env.is_empty() {
                None
            } else {
                Some(config.env.clone())
            },
            host_config: Some(host_config),
            tty: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: config.name.clone(),
            platform: None,
        };

        let id = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| DockerError::RunFailed(format!("Failed to create container: {e}")))?
            .id;

        let result = self.start_and_wait(&id).await;

        if config.auto_remove {
            if let Err(e) = self.remove_container(&id).await {
                tracing::warn!(container = %id, error = %e, "failed to remove container");
            }
        }

        let output = result?;
        if output.exit_code != 0 {
            return Err(DockerError::NonZeroExit {
                code: output.exit_code,
                logs: output.logs,
            });
        }

        Ok(output)
    }

    async fn start_and_wait(&self, id: &str) -> Result<JobOutput, DockerError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| DockerError::RunFailed(format!("Failed to start container: {e}")))?;

        let exit_code = self.wait_container(id).await?;
        let logs = self.get_logs(id).await?;

        Ok(JobOutput { exit_code, logs })
    }

    /// Waits for a container to finish executing.
    ///
    /// # Returns
    ///
    /// The exit code of the container.
    pub async fn wait_container(&self, id: &str) -> Result<i64, DockerError> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut stream = self.docker.wait_container(id, Some(options));

        if let Some(result) = stream.next().await {
            let wait_response = result
                .map_err(|e| DockerError::RunFailed(format!("Error waiting for container: {e}")))?;

            return Ok(wait_response.status_code);
        }

        Err(DockerError::RunFailed(
            "Container did not exit normally".to_string(),
        ))
    }

    /// Gets combined stdout and stderr logs from a container.
    pub async fn get_logs(&self, id: &str) -> Result<String, DockerError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            ..Default::default()
        };

        let mut logs = self.docker.logs(id, Some(options));
        let mut output = String::new();

        while let Some(chunk) = logs.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(DockerError::RunFailed(format!("Error reading logs: {e}")));
                }
            }
        }

        Ok(output)
    }

    /// Removes a container, forcing removal if it is still running.
    pub async fn remove_container(&self, id: &str) -> Result<(), DockerError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true, // Remove volumes
            ..Default::default()
        };

        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| {
                if e.to_string().contains("No such container") {
                    DockerError::ContainerNotFound { id: id.to_string() }
                } else {
                    DockerError::RunFailed(format!("Failed to remove container: {e}"))
                }
            })?;

        Ok(())
    }
}
