pub const SYSTEM_PROMPT: &str = "You are a trading update parser. You read announcements from a trading firm and extract scheduled maintenance windows and market closures. You reply only with JSON.";

const USER_PROMPT_TEMPLATE: &str = "Analyze the following text from a trading update. Your task is to identify every scheduled maintenance or market closure related to cTrader or cryptocurrencies.

For each such event, extract the exact start date and time and the exact end date and time.
The text explicitly states its times are in \"GMT+3\". Report the times exactly as they are written in GMT+3, without converting them to any other zone.

Provide the output ONLY as a JSON array. Each element must adhere strictly to the following format:
[{
  \"start_time\": \"YYYY-MM-DDTHH:MM:SS\",
  \"end_time\": \"YYYY-MM-DDTHH:MM:SS\"
}]

If the text mentions no specific event date and time, return an empty array: []
Do not include any introductory text, explanations, or markdown. The response must start with `[` and end with `]`.

Text to analyze:
---
{text}
---";

/// Build the extraction prompt for one update
pub fn build_prompt(text: &str) -> String {
    USER_PROMPT_TEMPLATE.replace("{text}", text)
}
