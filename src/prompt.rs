//! Prompt templates sent to the completion service.

use crate::store::TABLE_NAME;

/// Prompt asking for a SQL query answering the user's question.
pub fn query_prompt(question: &str, columns: &str) -> String {
    format!(
        "Write a SQL query based on this question: {question} \
         The table name is {TABLE_NAME} and the table has the following columns: {columns}. \
         Return only a SQL query and nothing else"
    )
}

/// Prompt asking for a plotting script in the closed two-line grammar
/// understood by the chart executor.
pub fn chart_prompt(request: &str, columns: &str) -> String {
    format!(
        "Write a plotting script to address the following request: {request} \
         The data has the following columns: {columns}. \
         The script must be exactly two lines. The first line is \
         fig = FUNC(x=COLUMN, y=COLUMN, agg=AGG, title=\"TITLE\") \
         where FUNC is one of bar, line or scatter, the agg argument is optional and \
         one of sum, mean, min, max or count, and the title argument is optional. \
         The second line is fig.show() \
         Return only the script and nothing else"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_prompt_embeds_question_table_and_columns() {
        let p = query_prompt("What is the total sales in 2022?", "Country, Total_Sales");
        assert!(p.contains("What is the total sales in 2022?"));
        assert!(p.contains("table name is df"));
        assert!(p.contains("Country, Total_Sales"));
        assert!(p.contains("Return only a SQL query"));
    }

    #[test]
    fn test_chart_prompt_embeds_request_and_grammar() {
        let p = chart_prompt("Plot total sales by country", "Country, Total_Sales");
        assert!(p.contains("Plot total sales by country"));
        assert!(p.contains("Country, Total_Sales"));
        assert!(p.contains("fig.show()"));
        assert!(p.contains("bar, line or scatter"));
    }
}
