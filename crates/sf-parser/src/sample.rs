/// Purchase-approval walkthrough shipped as the designer's starter document.
pub const SAMPLE_MARKDOWN: &str = "# BusinessProcessName
購買申請承認プロセス

## Description
従業員が物品やサービスを購入する際の申請から承認、発注、検収までの一連の業務フロー

## Dept
申請者
総務部
購買担当
経理部
承認者

## Process
#P1 #L1 申請者 開始
Next: P2

#P2 #L2 申請者 購買申請書作成
Next: P3

#P3 #L3 総務部 申請内容確認
Yes: P4
No: P2

#P4 #L4 経理部 予算確認
Yes: P5
No: P6

#P5 #L5 承認者 一次承認
Next: P7

#P6 #L5 申請者 申請内容修正
Next: P3

#P7 #L6 経理部 金額判定
Yes: P8
No: P9

#P8 #L7 承認者 最終承認
Next: P9

#P9 #L8 購買担当 発注処理
Next: P10

#P10 #L9 購買担当 納品確認
Next: P11

#P11 #L10 経理部 検収完了
Next: P12

#P12 #L11 経理部 完了

## Reports
購買申請書 #L: 2
予算確認書 #L: 4
承認記録 #L: 5, 7
発注書 #L: 8
検収書 #L: 10
納品書 #L: 9

## Systems
購買管理システム #L: 2, 8, 9, 10
予算管理システム #L: 4
承認ワークフロー #L: 5, 7
";
