use std::{
  collections::VecDeque,
  time::{Duration, Instant},
};

use log::info;

use crate::sprite::{Speech, SpeechStyle};

/// Everything the runtime needs from the world outside the scripts.
pub trait Peripherals {
  /// Time passed since the previous call.
  fn elapsed_time(&mut self) -> Duration;
  /// The answer to the most recent `ask`.
  fn read_prompt_answer(&mut self) -> String;
  fn ask(&mut self, sprite: &str, question: &str);
  /// Shows or, with `None`, clears a sprite's speech bubble.
  fn say(&mut self, sprite: &str, speech: Option<&Speech>);
}

#[derive(Debug)]
enum Clock {
  Wall(Option<Instant>),
  Fixed(Duration),
}

/// Peripherals without a screen: speech is logged and recorded, prompts are
/// answered from a queue.
#[derive(Debug)]
pub struct Headless {
  clock: Clock,
  answers: VecDeque<String>,
  last_answer: String,
  transcript: Vec<(String, Speech)>,
  echo: bool,
}

impl Headless {
  /// Measures real time between ticks.
  pub fn new() -> Self {
    Headless::with_clock(Clock::Wall(None))
  }

  /// Advances a simulated clock by `step` every time it is read.
  pub fn with_fixed_step(step: Duration) -> Self {
    Headless::with_clock(Clock::Fixed(step))
  }

  fn with_clock(clock: Clock) -> Self {
    Headless {
      clock,
      answers: VecDeque::new(),
      last_answer: String::new(),
      transcript: Vec::new(),
      echo: false,
    }
  }

  pub fn answers(mut self, answers: impl IntoIterator<Item = String>) -> Self {
    self.answers.extend(answers);
    self
  }

  /// Prints speech to stdout as well.
  pub fn echo(mut self, echo: bool) -> Self {
    self.echo = echo;
    self
  }

  pub fn transcript(&self) -> &[(String, Speech)] {
    &self.transcript
  }
}

impl Default for Headless {
  fn default() -> Self {
    Headless::new()
  }
}

impl Peripherals for Headless {
  fn elapsed_time(&mut self) -> Duration {
    match &mut self.clock {
      Clock::Fixed(step) => *step,
      Clock::Wall(last) => {
        let now = Instant::now();
        let elapsed = last.map_or(Duration::ZERO, |last| now - last);
        *last = Some(now);
        elapsed
      }
    }
  }

  fn read_prompt_answer(&mut self) -> String {
    self.last_answer.clone()
  }

  fn ask(&mut self, sprite: &str, question: &str) {
    self.last_answer = self.answers.pop_front().unwrap_or_default();
    info!("{sprite} asks {question:?}, answered {:?}", self.last_answer);
  }

  fn say(&mut self, sprite: &str, speech: Option<&Speech>) {
    let Some(speech) = speech else {
      return;
    };
    let verb = match speech.style {
      SpeechStyle::Say => "says",
      SpeechStyle::Think => "thinks",
    };
    info!("{sprite} {verb} {:?}", speech.text);
    if self.echo {
      println!("{sprite}: {}", speech.text);
    }
    self.transcript.push((sprite.to_string(), speech.clone()));
  }
}
