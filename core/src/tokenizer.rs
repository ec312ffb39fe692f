use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Unspaced scripts first, then words that exclude those scripts so a mixed
    // run like "abc中文" splits at the script boundary. The prolonged sound mark
    // and the iteration mark are Script=Common but belong to kana/Han runs.
    static ref RE: Regex = Regex::new(
        r"(?u)[\p{Han}\p{Hiragana}\p{Katakana}\x{30FC}\x{3005}]+|[[\p{L}\p{N}]--[\p{Han}\p{Hiragana}\p{Katakana}\x{30FC}\x{3005}]][[\p{L}\p{N}_']--[\p{Han}\p{Hiragana}\p{Katakana}\x{30FC}\x{3005}]]*"
    )
    .expect("valid regex");
    static ref UNSPACED: Regex = Regex::new(r"^[\p{Han}\p{Hiragana}\p{Katakana}\x{30FC}\x{3005}]").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
            // Chinese: single characters only surface as unigrams of one-character runs.
            "的","了","是","在","和","与","及","或","也","都","就","而","被","把","对","从","将","为","之","其","这","那","着","吗","呢","吧","啊",
            "我们","你们","他们","她们","它们","这个","那个","这些","那些","一个","没有","什么","因为","所以","但是","而且","如果","已经","以及","还是",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into normalized terms in document order.
///
/// NFKC normalization folds full-width forms, then text is lowercased. Runs of
/// Han/kana characters have no word delimiters and are cut into overlapping
/// character bigrams (a one-character run stays a unigram); other runs are
/// letter/digit words. Stop words are dropped last.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let run = mat.as_str();
        if UNSPACED.is_match(run) {
            push_bigrams(run, &mut tokens);
        } else if !is_stopword(run) {
            tokens.push(run.to_string());
        }
    }
    tokens
}

fn push_bigrams(run: &str, tokens: &mut Vec<String>) {
    let chars: Vec<char> = run.chars().collect();
    if chars.len() == 1 {
        let unigram = chars[0].to_string();
        if !is_stopword(&unigram) {
            tokens.push(unigram);
        }
        return;
    }
    for pair in chars.windows(2) {
        let bigram: String = pair.iter().collect();
        if !is_stopword(&bigram) {
            tokens.push(bigram);
        }
    }
}

/// Occurrence count of every term in `text`.
pub fn term_frequencies(text: &str) -> HashMap<String, u32> {
    let mut freqs = HashMap::new();
    for term in tokenize(text) {
        *freqs.entry(term).or_insert(0) += 1;
    }
    freqs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Election results, released TODAY!");
        assert_eq!(t, vec!["election", "results", "released", "today"]);
    }

    #[test]
    fn han_runs_become_bigrams() {
        assert_eq!(tokenize("北京天气"), vec!["北京", "京天", "天气"]);
        assert_eq!(tokenize("雨"), vec!["雨"]);
    }

    #[test]
    fn mixed_scripts_split_at_boundary() {
        assert_eq!(tokenize("5G网络"), vec!["5g", "网络"]);
    }
}
