#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use draw_core::{RoundNumber, Row};
use draw_engine::{
    ChannelClient, ChannelError, Clock, FeedError, FeedFailure, MessageHandle, ResultSource,
};

pub fn init_logging() {
    relay_logging::initialize_for_tests();
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

pub fn row(rn: RoundNumber) -> Row {
    let minutes = rn * 5;
    Row::normalized(
        rn,
        format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60),
        Some(&(100 + rn).to_string()),
        Some(&(rn % 100).to_string()),
    )
}

pub fn rows(rounds: impl IntoIterator<Item = RoundNumber>) -> Vec<Row> {
    rounds.into_iter().map(row).collect()
}

/// Feed whose per-day answers can be changed between polls.
#[derive(Clone, Default)]
pub struct FakeSource {
    days: Arc<Mutex<HashMap<NaiveDate, Result<Vec<Row>, FeedError>>>>,
    requests: Arc<Mutex<Vec<NaiveDate>>>,
}

impl FakeSource {
    pub fn set(&self, day: NaiveDate, answer: Result<Vec<Row>, FeedError>) {
        self.days.lock().unwrap().insert(day, answer);
    }

    pub fn requests(&self) -> Vec<NaiveDate> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ResultSource for FakeSource {
    async fn fetch(&self, day: NaiveDate) -> Result<Vec<Row>, FeedError> {
        self.requests.lock().unwrap().push(day);
        self.days
            .lock()
            .unwrap()
            .get(&day)
            .cloned()
            .unwrap_or_else(|| Err(FeedError::new(FeedFailure::Unavailable, "404 Not Found")))
    }
}

#[derive(Clone)]
pub struct ManualClock {
    today: Arc<Mutex<NaiveDate>>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Arc::new(Mutex::new(today)),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock().unwrap() = today;
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send(String),
    Edit(String, String),
}

/// Channel that records every request and answers from a script, succeeding
/// once the script runs out.
#[derive(Clone)]
pub struct ScriptedChannel {
    name: String,
    max_chars: usize,
    send_script: Arc<Mutex<VecDeque<Result<Option<MessageHandle>, ChannelError>>>>,
    edit_script: Arc<Mutex<VecDeque<Result<(), ChannelError>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            max_chars: 10_000,
            send_script: Arc::default(),
            edit_script: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn push_send(&self, answer: Result<Option<MessageHandle>, ChannelError>) {
        self.send_script.lock().unwrap().push_back(answer);
    }

    pub fn push_edit(&self, answer: Result<(), ChannelError>) {
        self.edit_script.lock().unwrap().push_back(answer);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| match call {
                Call::Send(text) | Call::Edit(_, text) => text,
            })
            .collect()
    }

    pub fn boxed(&self) -> Box<dyn ChannelClient> {
        Box::new(self.clone())
    }
}

#[async_trait::async_trait]
impl ChannelClient for ScriptedChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }

    async fn send(&self, text: &str) -> Result<Option<MessageHandle>, ChannelError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Call::Send(text.to_string()));
        let sends = calls.iter().filter(|c| matches!(c, Call::Send(_))).count();
        drop(calls);
        self.send_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(MessageHandle(format!("{}-{sends}", self.name)))))
    }

    async fn edit(&self, handle: &MessageHandle, text: &str) -> Result<(), ChannelError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Edit(handle.0.clone(), text.to_string()));
        self.edit_script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}
