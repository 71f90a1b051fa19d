#![allow(dead_code)]

use mirrormuse::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn outfit(tag: &str, score: f64) -> OutfitResult {
    OutfitResult {
        top_url: format!("{}-top.png", tag),
        bottom_url: format!("{}-bottom.png", tag),
        try_on_url: format!("{}.png", tag),
        commentary: Commentary::Text(format!("{} looks balanced.\n综合评分: {}", tag, score)),
        score,
        grading: None,
    }
}

pub fn outfits(tag: &str) -> GenerationResult {
    GenerationResult {
        custom: outfit(&format!("{}-custom", tag), 7.0),
        generated: outfit(&format!("{}-generated", tag), 9.0),
        recommendations: None,
    }
}

pub enum Script {
    Respond {
        delay: Duration,
        result: GenerationResult,
    },
    Fail(StylistError),
}

impl Script {
    pub fn respond(result: GenerationResult) -> Self {
        Script::Respond {
            delay: Duration::ZERO,
            result,
        }
    }

    pub fn respond_after(delay: Duration, result: GenerationResult) -> Self {
        Script::Respond { delay, result }
    }
}

/// Generation backend that answers each call with the next scripted reply.
#[derive(Default)]
pub struct ScriptedGeneration {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<(&'static str, String)>>>,
}

impl ScriptedGeneration {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Form fields of every request received so far.
    pub fn requests(&self) -> Vec<Vec<(&'static str, String)>> {
        self.requests.lock().unwrap().clone()
    }
}

impl GenerationBackend for ScriptedGeneration {
    async fn generate(&self, request: &SubmissionRequest) -> Result<GenerationResult> {
        self.requests.lock().unwrap().push(request.form.to_fields());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Respond { delay, result }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(result)
            }
            Some(Script::Fail(err)) => Err(err),
            None => Err(StylistError::Other("no scripted response left".into())),
        }
    }
}

/// Hairstyle backend with configurable latency and failures that records
/// how many calls overlap.
pub struct ScriptedHairstyles {
    pub latency: Duration,
    pub always_fail: bool,
    pub recommend_calls: AtomicUsize,
    pub try_on_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Default for ScriptedHairstyles {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(500),
            always_fail: false,
            recommend_calls: AtomicUsize::new(0),
            try_on_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl ScriptedHairstyles {
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Default::default()
        }
    }

    pub fn recommend_calls(&self) -> usize {
        self.recommend_calls.load(Ordering::SeqCst)
    }

    pub fn try_on_calls(&self) -> usize {
        self.try_on_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl HairstyleBackend for ScriptedHairstyles {
    async fn recommend(&self, image_url: &str, _style_preference: &str) -> Result<Vec<Hairstyle>> {
        self.recommend_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.always_fail {
            return Err(StylistError::Http {
                status: 503,
                message: "hairstyle service unavailable".into(),
            });
        }
        Ok(vec![
            Hairstyle {
                hairstyle: format!("Layered bob for {}", image_url),
                reasons: "Frames the face".into(),
                img: String::new(),
            },
            Hairstyle {
                hairstyle: format!("Soft waves for {}", image_url),
                reasons: "Adds volume".into(),
                img: String::new(),
            },
        ])
    }

    async fn try_on(&self, image_url: &str, hairstyle: &Hairstyle) -> Result<String> {
        self.try_on_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        Ok(format!("{}+{}", image_url, hairstyle.hairstyle))
    }
}

pub fn test_config(plan: HairstylePlan) -> StylistConfig {
    StylistConfig::builder()
        .with_language(Language::Zh)
        .with_stage_delay(Duration::ZERO)
        .with_hairstyles(plan)
        .build()
}

pub fn jpeg(name: &str) -> ImageUpload {
    ImageUpload::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}

/// Select all three uploads and fill the form with 165/50/84/64/90.
pub fn fill<G, H>(session: &StylistSession<G, H>)
where
    G: GenerationBackend,
    H: HairstyleBackend,
{
    session
        .select_upload(UploadSlot::PersonPhoto, jpeg("person.jpg"))
        .unwrap();
    session
        .select_upload(UploadSlot::TopGarment, jpeg("top.jpg"))
        .unwrap();
    session
        .select_upload(UploadSlot::BottomGarment, jpeg("bottom.jpg"))
        .unwrap();
    for (field, value) in MeasurementField::ALL
        .into_iter()
        .zip(["165", "50", "84", "64", "90"])
    {
        session.set_measurement(field, value);
    }
}

/// One-shot HTTP server on a loopback port that answers a single request
/// with a canned response and hands back the raw request it received.
pub struct CannedServer {
    pub base_url: String,
    request: tokio::task::JoinHandle<String>,
}

impl CannedServer {
    pub async fn start(status: u16, content_type: &str, body: &str) -> Self {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            if status < 400 { "OK" } else { "Error" },
            content_type,
            body.len(),
            body
        );
        let request = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        Self { base_url, request }
    }

    /// The request as received, lossily decoded as UTF-8.
    pub async fn request(self) -> String {
        self.request.await.unwrap()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    use tokio::io::AsyncReadExt;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let body_len = buf.len() - (end + 4);
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());
        let complete = match length {
            Some(length) => body_len >= length,
            None if head.contains("transfer-encoding: chunked") => buf.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if complete {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn generation_body(tag: &str) -> String {
    serde_json::to_string(&outfits(tag)).unwrap()
}
