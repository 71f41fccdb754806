//! Copernicus Climate Data Store retrieval API.

use std::{
    io::{ErrorKind, Read, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use bon::Builder;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use ureq::Agent;

use crate::{
    error::ClimateError,
    prelude::*,
    reanalysis::{ArchiveService, RetrievalRequest},
};

pub const DEFAULT_URL: &str = "https://cds.climate.copernicus.eu/api";

const CANCELLATION_CHECK_INTERVAL: Duration = Duration::from_millis(200);
const DOWNLOAD_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Builder)]
pub struct Client {
    #[builder(default = Agent::config_builder().build().into())]
    agent: Agent,

    #[builder(into, default = DEFAULT_URL.to_owned())]
    url: String,

    /// Personal access token.
    #[builder(into)]
    key: String,

    #[builder(default = Duration::from_secs(1))]
    initial_poll_interval: Duration,

    #[builder(default = Duration::from_secs(120))]
    max_poll_interval: Duration,

    /// Once raised, the running job is cancelled at the next poll.
    cancellation: Option<Arc<AtomicBool>>,
}

impl Client {
    /// Queues a retrieval request.
    #[instrument(skip_all, fields(dataset = dataset))]
    pub fn submit(&self, dataset: &str, request: &RetrievalRequest) -> Result<Job, ClimateError> {
        #[derive(Serialize)]
        struct Execution<'a> {
            inputs: &'a RetrievalRequest,
        }

        let url = format!("{}/retrieve/v1/processes/{dataset}/execution", self.url);
        let job = self
            .agent
            .post(&url)
            .header("PRIVATE-TOKEN", &self.key)
            .send_json(Execution { inputs: request })
            .map_err(call_error(&url))?
            .body_mut()
            .read_json::<Job>()
            .map_err(call_error(&url))?;
        info!(job_id = %job.id, status = ?job.status, "submitted");
        Ok(job)
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(job_id = job_id))]
    pub fn status(&self, job_id: &str) -> Result<Job, ClimateError> {
        let url = format!("{}/retrieve/v1/jobs/{job_id}", self.url);
        self.agent
            .get(&url)
            .header("PRIVATE-TOKEN", &self.key)
            .call()
            .map_err(call_error(&url))?
            .body_mut()
            .read_json::<Job>()
            .map_err(call_error(&url))
    }

    #[instrument(skip_all, fields(job_id = job_id))]
    pub fn cancel(&self, job_id: &str) -> Result<(), ClimateError> {
        let url = format!("{}/retrieve/v1/jobs/{job_id}", self.url);
        self.agent
            .delete(&url)
            .header("PRIVATE-TOKEN", &self.key)
            .call()
            .map_err(call_error(&url))?;
        warn!("cancelled");
        Ok(())
    }

    /// Streams the result of a successful job into `target`, returns the number of bytes written.
    ///
    /// The file is written next to `target` and moved into place only once complete,
    /// so a failed or cancelled download leaves `target` untouched.
    #[instrument(skip_all, fields(job_id = job_id, target = %target.display()))]
    pub fn download(&self, job_id: &str, target: &Path) -> Result<u64, ClimateError> {
        let url = format!("{}/retrieve/v1/jobs/{job_id}/results", self.url);
        let results = self
            .agent
            .get(&url)
            .header("PRIVATE-TOKEN", &self.key)
            .call()
            .map_err(call_error(&url))?
            .body_mut()
            .read_json::<Results>()
            .map_err(call_error(&url))?;
        let href = results.asset.value.href;
        info!(%href, size = ?results.asset.value.size, "downloading…");

        let io_error = |source| ClimateError::Io { path: target.to_owned(), source };
        let mut response = self.agent.get(&href).call().map_err(call_error(&href))?;
        let directory = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(directory).map_err(io_error)?;

        let mut reader = response.body_mut().as_reader();
        let mut buffer = vec![0; DOWNLOAD_BUFFER_SIZE];
        let mut n_bytes = 0_u64;
        loop {
            if self.is_cancelled() {
                return Err(ClimateError::archive(format!(
                    "download of job `{job_id}` was cancelled"
                )));
            }
            let n_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n_read) => n_read,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(io_error(error)),
            };
            file.write_all(&buffer[..n_read]).map_err(io_error)?;
            n_bytes += n_read as u64;
        }
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(target).map_err(|error| io_error(error.error))?;
        info!(n_bytes, "downloaded");
        Ok(n_bytes)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Sleeps for `duration`, returns early with `true` when cancelled.
    fn sleep_or_cancel(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            thread::sleep(remaining.min(CANCELLATION_CHECK_INTERVAL));
        }
    }
}

impl ArchiveService for Client {
    #[instrument(skip_all, fields(dataset = dataset, target = %target.display()))]
    fn retrieve(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
        target: &Path,
    ) -> Result<(), ClimateError> {
        let mut job = self.submit(dataset, request)?;
        let mut poll_interval = self.initial_poll_interval;
        loop {
            match job.status {
                JobStatus::Successful => break,
                JobStatus::Accepted | JobStatus::Running => {}
                status @ (JobStatus::Failed | JobStatus::Rejected | JobStatus::Dismissed) => {
                    return Err(ClimateError::archive(format!("job `{}` is {status:?}", job.id)));
                }
            }
            if self.sleep_or_cancel(poll_interval) {
                self.cancel(&job.id)?;
                return Err(ClimateError::archive(format!("job `{}` was cancelled", job.id)));
            }
            poll_interval = next_poll_interval(poll_interval, self.max_poll_interval);

            let previous_status = job.status;
            job = self.status(&job.id)?;
            if job.status == previous_status {
                debug!(status = ?job.status, next_poll_in = ?poll_interval, "still waiting…");
            } else {
                info!(status = ?job.status, "job status changed");
            }
        }
        self.download(&job.id, target)?;
        Ok(())
    }
}

fn next_poll_interval(current: Duration, max: Duration) -> Duration {
    current.mul_f64(1.5).min(max)
}

/// Non-success statuses are archive failures, anything else is a transport failure.
fn call_error(url: &str) -> impl Fn(ureq::Error) -> ClimateError + '_ {
    move |error| match error {
        ureq::Error::StatusCode(status) => {
            ClimateError::archive(format!("`{url}` responded with HTTP {status}"))
        }
        source => ClimateError::Transport { url: url.to_owned(), source },
    }
}

#[must_use]
#[derive(Debug, Deserialize)]
pub struct Job {
    #[serde(rename = "jobID")]
    pub id: String,

    pub status: JobStatus,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Accepted,
    Running,
    Successful,
    Failed,
    Rejected,
    Dismissed,
}

#[derive(Deserialize)]
struct Results {
    asset: Asset,
}

#[derive(Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Deserialize)]
struct AssetValue {
    href: String,

    #[serde(rename = "file:size")]
    size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{self, BufRead, BufReader},
        net::{TcpListener, TcpStream},
        sync::Mutex,
    };

    use super::*;
    use crate::{
        grid::BoundingBox,
        reanalysis::{DATASET, GRID_RESOLUTION},
    };

    enum Answer {
        Json(u16, String),

        /// Advertises more bytes than it sends.
        Truncated(&'static str),
    }

    /// Local HTTP server that answers one connection per canned answer, in order.
    struct Server {
        url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl Server {
        fn start(answers: impl FnOnce(&str) -> Vec<Answer>) -> Result<Self> {
            let listener = TcpListener::bind("127.0.0.1:0")?;
            let url = format!("http://{}", listener.local_addr()?);
            let answers = answers(&url);
            let requests = Arc::new(Mutex::new(Vec::new()));
            thread::spawn({
                let requests = Arc::clone(&requests);
                move || {
                    for answer in answers {
                        let Ok((mut stream, _)) = listener.accept() else { return };
                        let Ok(request) = read_request(&stream) else { return };
                        requests.lock().unwrap().push(request);
                        let response = match answer {
                            Answer::Json(status, body) => format!(
                                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\n\
                                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                                body.len(),
                            ),
                            Answer::Truncated(body) => format!(
                                "HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\
                                 Connection: close\r\n\r\n{body}",
                            ),
                        };
                        let _ = stream.write_all(response.as_bytes());
                    }
                }
            });
            Ok(Self { url, requests })
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn client(&self, cancellation: Option<Arc<AtomicBool>>) -> Client {
            Client::builder()
                .agent(Agent::config_builder().proxy(None).build().into())
                .initial_poll_interval(Duration::from_millis(10))
                .url(&self.url)
                .key("key")
                .maybe_cancellation(cancellation)
                .build()
        }
    }

    /// Reads the request head and body, returns the method and the path.
    fn read_request(stream: &TcpStream) -> io::Result<String> {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().unwrap_or_default();
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body)?;
        Ok(request_line.split_whitespace().take(2).collect::<Vec<_>>().join(" "))
    }

    fn job(status: &str) -> Answer {
        Answer::Json(200, format!(r#"{{"jobID": "1", "status": "{status}"}}"#))
    }

    fn results(url: &str) -> Answer {
        Answer::Json(
            200,
            format!(r#"{{"asset": {{"value": {{"href": "{url}/cache/1.grib", "file:size": 4}}}}}}"#),
        )
    }

    fn request() -> Result<RetrievalRequest> {
        let bbox = BoundingBox::single_cell(5.16, 52.03, GRID_RESOLUTION)?;
        Ok(RetrievalRequest::hourly_year(2019, bbox))
    }

    #[test]
    fn retrieve_ok() -> Result {
        let server = Server::start(|url| {
            vec![
                job("accepted"),
                job("running"),
                job("successful"),
                results(url),
                Answer::Json(200, "GRIB".to_owned()),
            ]
        })?;
        let directory = tempfile::tempdir()?;
        let target = directory.path().join("era5.grib");

        server.client(None).retrieve(DATASET, &request()?, &target)?;

        assert_eq!(fs::read_to_string(&target)?, "GRIB");
        assert_eq!(
            server.requests(),
            [
                "POST /retrieve/v1/processes/reanalysis-era5-single-levels/execution",
                "GET /retrieve/v1/jobs/1",
                "GET /retrieve/v1/jobs/1",
                "GET /retrieve/v1/jobs/1/results",
                "GET /cache/1.grib",
            ],
        );
        Ok(())
    }

    #[test]
    fn retrieve_failed_job() -> Result {
        let server = Server::start(|_| vec![job("accepted"), job("failed")])?;
        let directory = tempfile::tempdir()?;
        let target = directory.path().join("era5.grib");

        let error = server.client(None).retrieve(DATASET, &request()?, &target).unwrap_err();

        assert!(matches!(error, ClimateError::ArchiveRetrieval { .. }), "{error}");
        assert!(!target.exists());
        Ok(())
    }

    #[test]
    fn retrieve_rejected_on_submit() -> Result {
        let server = Server::start(|_| vec![job("rejected")])?;
        let directory = tempfile::tempdir()?;
        let target = directory.path().join("era5.grib");
        let error = server.client(None).retrieve(DATASET, &request()?, &target).unwrap_err();
        assert!(matches!(error, ClimateError::ArchiveRetrieval { .. }), "{error}");
        Ok(())
    }

    #[test]
    fn retrieve_cancelled_deletes_job() -> Result {
        let server = Server::start(|_| vec![job("accepted"), Answer::Json(200, "{}".to_owned())])?;
        let directory = tempfile::tempdir()?;
        let target = directory.path().join("era5.grib");
        let client = server.client(Some(Arc::new(AtomicBool::new(true))));

        let error = client.retrieve(DATASET, &request()?, &target).unwrap_err();

        assert!(matches!(error, ClimateError::ArchiveRetrieval { .. }), "{error}");
        assert_eq!(server.requests().last().map(String::as_str), Some("DELETE /retrieve/v1/jobs/1"));
        assert!(!target.exists());
        Ok(())
    }

    #[test]
    fn error_status_is_archive_error() -> Result {
        let server =
            Server::start(|_| vec![Answer::Json(401, r#"{"detail": "unauthorized"}"#.to_owned())])?;
        let error = server.client(None).submit(DATASET, &request()?).unwrap_err();
        assert!(matches!(error, ClimateError::ArchiveRetrieval { .. }), "{error}");
        Ok(())
    }

    #[test]
    fn connection_failure_is_transport_error() -> Result {
        let url = {
            let listener = TcpListener::bind("127.0.0.1:0")?;
            format!("http://{}", listener.local_addr()?)
        };
        let client = Client::builder()
            .agent(Agent::config_builder().proxy(None).build().into())
            .url(url)
            .key("key")
            .build();
        let error = client.status("1").unwrap_err();
        assert!(matches!(error, ClimateError::Transport { .. }), "{error}");
        Ok(())
    }

    #[test]
    fn truncated_download_keeps_target() -> Result {
        let server = Server::start(|url| vec![results(url), Answer::Truncated("GRIB-partial")])?;
        let directory = tempfile::tempdir()?;
        let target = directory.path().join("era5.grib");
        fs::write(&target, "previous")?;

        assert!(server.client(None).download("1", &target).is_err());

        assert_eq!(fs::read_to_string(&target)?, "previous");
        assert_eq!(fs::read_dir(directory.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn cancelled_download_leaves_nothing() -> Result {
        let server =
            Server::start(|url| vec![results(url), Answer::Json(200, "GRIB".to_owned())])?;
        let directory = tempfile::tempdir()?;
        let target = directory.path().join("era5.grib");
        let client = server.client(Some(Arc::new(AtomicBool::new(true))));

        let error = client.download("1", &target).unwrap_err();

        assert!(matches!(error, ClimateError::ArchiveRetrieval { .. }), "{error}");
        assert_eq!(fs::read_dir(directory.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn job_ok() -> Result {
        // language=json
        let body = r#"{
            "processID": "reanalysis-era5-single-levels",
            "type": "process",
            "jobID": "0c4b2b6f-3d0e-4a6c-9a47-0f4bd2a7a1b2",
            "status": "accepted",
            "created": "2024-10-01T12:00:00.000000",
            "updated": "2024-10-01T12:00:00.000000"
        }"#;
        let job = serde_json::from_str::<Job>(body)?;
        assert_eq!(job.id, "0c4b2b6f-3d0e-4a6c-9a47-0f4bd2a7a1b2");
        assert_eq!(job.status, JobStatus::Accepted);
        Ok(())
    }

    #[test]
    fn job_failed_ok() -> Result {
        let job = serde_json::from_str::<Job>(r#"{"jobID": "1", "status": "failed"}"#)?;
        assert_eq!(job.status, JobStatus::Failed);
        Ok(())
    }

    #[test]
    fn results_ok() -> Result {
        // language=json
        let body = r#"{
            "asset": {
                "value": {
                    "type": "application/x-grib",
                    "href": "https://object-store.os-api.cci2.ecmwf.int/cci2-prod-cache/abc.grib",
                    "file:checksum": "d41d8cd98f00b204e9800998ecf8427e",
                    "file:size": 1234567,
                    "file:local_path": "s3://cci2-prod-cache/abc.grib"
                }
            }
        }"#;
        let results = serde_json::from_str::<Results>(body)?;
        assert!(results.asset.value.href.ends_with("abc.grib"));
        assert_eq!(results.asset.value.size, Some(1_234_567));
        Ok(())
    }

    #[test]
    fn next_poll_interval_ok() {
        let max = Duration::from_secs(120);
        assert_eq!(next_poll_interval(Duration::from_secs(2), max), Duration::from_secs(3));
        assert_eq!(next_poll_interval(Duration::from_secs(100), max), max);
    }

    #[test]
    fn sleep_or_cancel_returns_early() {
        let flag = Arc::new(AtomicBool::new(true));
        let client = Client::builder().key("key").cancellation(Arc::clone(&flag)).build();
        let started_at = Instant::now();
        assert!(client.sleep_or_cancel(Duration::from_secs(60)));
        assert!(started_at.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn sleep_without_cancellation() {
        let client = Client::builder().key("key").build();
        assert!(!client.sleep_or_cancel(Duration::from_millis(10)));
    }
}
