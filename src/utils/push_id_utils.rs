use rand::Rng;

/// Alphabet in ASCII order, so generated ids sort lexicographically by creation time.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generates 20-character, time-ordered child keys in the realtime database format:
/// 8 characters of millisecond timestamp followed by 12 random characters.
///
/// Ids generated within the same millisecond increment the random suffix, so they
/// still sort in generation order.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_time: i64,
    last_random: [u8; 12],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, now_millis: i64) -> String {
        let duplicate_time = now_millis == self.last_time;
        self.last_time = now_millis;

        let mut id = Vec::with_capacity(20);
        let mut time = now_millis;
        let mut time_chars = [0u8; 8];
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(time % 64) as usize];
            time /= 64;
        }
        id.extend_from_slice(&time_chars);

        if duplicate_time {
            increment(&mut self.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for value in self.last_random.iter_mut() {
                *value = rng.gen_range(0..64);
            }
        }

        id.extend(self.last_random.iter().map(|&v| PUSH_CHARS[v as usize]));

        String::from_utf8(id).unwrap_or_default()
    }
}

fn increment(digits: &mut [u8; 12]) {
    for digit in digits.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
